pub mod data;
pub mod environment;
pub mod error;
pub mod logging;
pub mod module;
pub mod objective;
pub mod optim;
pub mod shared;

pub use error::{A3cError, Result};
