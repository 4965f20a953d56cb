use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress and cancellation shared by every worker of a training run.
///
/// The step counter is the only piece of cross-worker state updated under a
/// lock. The stop signal is read without synchronization; workers may take a
/// few more steps after it is raised.
#[derive(Debug, Default)]
pub struct SharedTrainingState {
    total_steps: Mutex<u64>,
    stop_signal: AtomicBool,
}

pub type SharedTrainingStateHandle = Arc<SharedTrainingState>;

impl SharedTrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTrainingStateHandle {
        Arc::new(Self::new())
    }

    /// Counts one environment step and returns the new total.
    pub fn increment_steps(&self) -> u64 {
        let mut steps = self.total_steps.lock();
        *steps += 1;
        *steps
    }

    pub fn total_steps(&self) -> u64 {
        *self.total_steps.lock()
    }

    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::Relaxed);
    }

    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::Relaxed)
    }
}
