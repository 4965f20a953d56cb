pub mod trajectory;
pub mod transition;
