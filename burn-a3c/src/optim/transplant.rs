use std::marker::PhantomData;

use burn::{
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransplantOutcome {
    pub transplanted: usize,
    pub short_circuited: bool,
}

struct Transplant<'a, B: AutodiffBackend> {
    global_ids: &'a [ParamId],
    position: usize,
    worker_grads: GradientsParams,
    pending: &'a mut GradientsParams,
    outcome: TransplantOutcome,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Transplant<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        let position = self.position;
        self.position += 1;
        if self.outcome.short_circuited {
            return;
        }
        let Some(global_id) = self.global_ids.get(position).copied() else {
            return;
        };
        if self.pending.get::<B::InnerBackend, D>(global_id).is_some() {
            self.outcome.short_circuited = true;
            return;
        }
        if let Some(grad) = self.worker_grads.remove::<B::InnerBackend, D>(id) {
            self.pending.register(global_id, grad);
            self.outcome.transplanted += 1;
        }
    }
}

/// Moves the worker's gradients onto the global gradient slots.
///
/// Parameters are paired by order: the `k`-th parameter of `worker` feeds the
/// slot of `global_ids[k]`. The walk stops at the first global slot that is
/// already occupied, leaving that slot and every later one as they were.
pub fn transplant_gradients<B: AutodiffBackend, M: AutodiffModule<B>>(
    worker: &M,
    worker_grads: GradientsParams,
    global_ids: &[ParamId],
    pending: &mut GradientsParams,
) -> TransplantOutcome {
    let mut visitor = Transplant::<B> {
        global_ids,
        position: 0,
        worker_grads,
        pending,
        outcome: TransplantOutcome::default(),
        backend: PhantomData,
    };
    worker.visit(&mut visitor);
    visitor.outcome
}
