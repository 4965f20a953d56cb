pub mod component;
pub mod exploration;
pub mod nn;
pub mod replica;
