//! The global network every worker trains.
//!
//! Workers never share memory with the store: they pull value copies of the
//! global parameters at synchronization points and push gradients into the
//! store's gradient slots.
//!
//! # Gradient application contract
//!
//! In [`GradientSyncMode::Relaxed`] (the default) an update is three separate
//! critical sections: clearing the slots, transplanting a worker's gradients,
//! and stepping the optimizer. Workers interleave freely between them, so a
//! worker may step gradients attached by another worker, find its own
//! gradients already consumed, or clear slots another worker just filled.
//! Those are the lost and stale updates of asynchronous SGD and are not
//! reported as errors.
//!
//! [`GradientSyncMode::Strict`] holds an update lock for the whole session so
//! updates from different workers are applied one at a time.

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::{
    error::Result as A3cResult,
    module::replica::{copy_parameters, ParameterLayout},
    optim::{transplant_gradients, TransplantOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientSyncMode {
    #[default]
    Relaxed,
    Strict,
}

#[derive(Config, Debug)]
pub struct ParameterStoreConfig {
    #[config(default = "GradientSyncMode::Relaxed")]
    pub mode: GradientSyncMode,
}

impl ParameterStoreConfig {
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(&self, model: M) -> ParameterStore<B, M> {
        ParameterStore {
            layout: ParameterLayout::of(&model),
            model: Mutex::new(model),
            pending: Mutex::new(GradientsParams::new()),
            update_lock: Mutex::new(()),
            mode: self.mode,
            version: AtomicU64::new(0),
            transplanted: AtomicUsize::new(0),
            short_circuits: AtomicUsize::new(0),
            steps: AtomicUsize::new(0),
            empty_steps: AtomicUsize::new(0),
            backend: PhantomData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStatistics {
    /// Gradients moved from workers onto global slots.
    pub transplanted: usize,
    /// Transplants that stopped at an occupied slot.
    pub short_circuits: usize,
    /// Optimizer steps that changed the global parameters.
    pub steps: usize,
    /// Optimizer steps that found no gradient attached.
    pub empty_steps: usize,
}

pub struct ParameterStore<B: AutodiffBackend, M: AutodiffModule<B>> {
    model: Mutex<M>,
    pending: Mutex<GradientsParams>,
    update_lock: Mutex<()>,
    layout: ParameterLayout,
    mode: GradientSyncMode,
    version: AtomicU64,
    transplanted: AtomicUsize,
    short_circuits: AtomicUsize,
    steps: AtomicUsize,
    empty_steps: AtomicUsize,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> ParameterStore<B, M> {
    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub fn mode(&self) -> GradientSyncMode {
        self.mode
    }

    /// Number of optimizer steps and restores applied so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn statistics(&self) -> SyncStatistics {
        SyncStatistics {
            transplanted: self.transplanted.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            steps: self.steps.load(Ordering::Relaxed),
            empty_steps: self.empty_steps.load(Ordering::Relaxed),
        }
    }

    /// Clone of the current global network.
    pub fn snapshot(&self) -> M {
        self.model.lock().clone()
    }

    /// Replaces the global parameter values with those of `source`.
    pub fn restore(&self, source: &M) -> A3cResult<()> {
        self.layout.check_compatible(&ParameterLayout::of(source))?;
        let mut model = self.model.lock();
        *model = copy_parameters(source, model.clone())?;
        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Overwrites the replica's parameter values with the global ones.
    pub fn pull(&self, replica: M) -> A3cResult<M> {
        let snapshot = self.snapshot();
        copy_parameters(&snapshot, replica)
    }

    pub fn has_pending_gradients(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    pub fn begin_update(&self) -> UpdateSession<'_, B, M> {
        let guard = match self.mode {
            GradientSyncMode::Strict => Some(self.update_lock.lock()),
            GradientSyncMode::Relaxed => None,
        };
        UpdateSession {
            store: self,
            _guard: guard,
        }
    }
}

/// One worker's zero-grad, transplant and step sequence.
pub struct UpdateSession<'a, B: AutodiffBackend, M: AutodiffModule<B>> {
    store: &'a ParameterStore<B, M>,
    _guard: Option<MutexGuard<'a, ()>>,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> UpdateSession<'_, B, M> {
    /// Drops whatever gradients are attached to the global slots.
    pub fn zero_grad(&self) {
        *self.store.pending.lock() = GradientsParams::new();
    }

    pub fn transplant(&self, worker: &M, grads: GradientsParams) -> TransplantOutcome {
        let mut pending = self.store.pending.lock();
        let outcome = transplant_gradients(worker, grads, &self.store.layout.ids, &mut pending);
        self.store
            .transplanted
            .fetch_add(outcome.transplanted, Ordering::Relaxed);
        if outcome.short_circuited {
            self.store.short_circuits.fetch_add(1, Ordering::Relaxed);
            log::debug!(
                "gradient transplant stopped at an occupied slot after {} parameters",
                outcome.transplanted
            );
        }
        outcome
    }

    /// Steps `optimizer` on the global network with the attached gradients,
    /// consuming them. Returns false when nothing was attached.
    pub fn step<O: Optimizer<M, B>>(&self, optimizer: &mut O, learning_rate: f64) -> bool {
        let grads = std::mem::replace(&mut *self.store.pending.lock(), GradientsParams::new());
        if grads.is_empty() {
            self.store.empty_steps.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let mut model = self.store.model.lock();
        *model = optimizer.step(learning_rate, model.clone(), grads);
        self.store.version.fetch_add(1, Ordering::Release);
        self.store.steps.fetch_add(1, Ordering::Relaxed);
        true
    }
}
