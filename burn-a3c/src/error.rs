use thiserror::Error;

use crate::environment::EnvironmentError;

/// Everything that can abort a worker.
///
/// Only the gradient race between workers is tolerated silently; it is not an
/// error and never shows up here.
#[derive(Error, Debug)]
pub enum A3cError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("non-positive variance {variance} at action dimension {index}")]
    NonPositiveVariance { index: usize, variance: f32 },

    #[error("loss is not finite: {0}")]
    NonFiniteLoss(f32),

    #[error("gradient norm is not finite: {0}")]
    NonFiniteGradient(f32),

    #[error("task produced a malformed reward: {0}")]
    MalformedReward(f64),

    #[error("action has {actual} dimensions, distribution has {expected}")]
    ActionDimension { expected: usize, actual: usize },

    #[error("segment has {transitions} transitions but {estimates} advantage estimates")]
    SegmentMismatch { transitions: usize, estimates: usize },

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("unable to read tensor data: {0}")]
    Tensor(String),

    #[error("unable to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

pub type Result<T> = std::result::Result<T, A3cError>;
