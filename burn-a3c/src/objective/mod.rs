pub mod actor_critic;
pub mod advantage;
pub mod gaussian;
