pub mod clipping;
pub mod transplant;

pub use clipping::{clip_grad_norm, gradient_norm};
pub use transplant::{transplant_gradients, TransplantOutcome};
