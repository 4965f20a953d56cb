pub mod asynchronous;
pub mod config;
pub mod pendulum;
pub mod worker;

pub use burn_a3c::error::{A3cError, Result};
