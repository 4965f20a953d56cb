use thiserror::Error;

pub type Reward = f64;
pub type Done = bool;

/// A continuous-control task stepped by a single worker.
///
/// Failures are returned rather than panicking so that a worker can stop with
/// a meaningful error; nothing in the core retries a failed step.
pub trait Environment {
    type A;
    type O: Clone;

    fn reset(&mut self, seed: Option<u64>) -> Result<Self::O, EnvironmentError>;

    fn step(&mut self, action: Self::A) -> Result<(Self::O, Reward, Done), EnvironmentError>;
}

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("environment error: {0}")]
    Task(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("expected an action with {expected} dimensions, got {actual}")]
    InvalidAction { expected: usize, actual: usize },

    #[error("step called on a finished episode, reset first")]
    EpisodeFinished,
}

pub mod pendulum;
