use burn::prelude::Backend;

use super::transition::Transition;

/// Ordered steps of the segment currently being collected, oldest first.
pub struct TrajectoryBuffer<B: Backend> {
    transitions: Vec<Transition<B>>,
    capacity: usize,
}

impl<B: Backend> TrajectoryBuffer<B> {
    pub fn new(capacity: usize) -> Self {
        TrajectoryBuffer {
            transitions: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition<B>) {
        self.transitions.push(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// True once the segment reached the update interval.
    pub fn is_full(&self) -> bool {
        self.transitions.len() >= self.capacity
    }

    pub fn rewards(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    pub fn values(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.value_estimate).collect()
    }

    /// Hands the segment over and leaves the buffer empty.
    pub fn take(&mut self) -> Vec<Transition<B>> {
        std::mem::replace(&mut self.transitions, Vec::with_capacity(self.capacity))
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}
