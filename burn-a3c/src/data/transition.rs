use burn::{prelude::Backend, tensor::Tensor};

use crate::{
    error::{A3cError, Result},
    module::component::{DistributionParams, GaussianPrediction},
};

/// One rollout step recorded for the next update.
///
/// The tensors still carry the autodiff graph of the forward pass that
/// produced them, so the loss can be differentiated through the replica.
#[derive(Debug, Clone)]
pub struct Transition<B: Backend> {
    pub mean: Tensor<B, 2>,
    pub variance: Tensor<B, 2>,
    pub value: Tensor<B, 2>,
    pub value_estimate: f32,
    pub action: Vec<f32>,
    pub reward: f32,
}

impl<B: Backend> Transition<B> {
    pub fn new(
        prediction: GaussianPrediction<B>,
        params: &DistributionParams,
        action: Vec<f32>,
        reward: f32,
    ) -> Result<Self> {
        if action.len() != params.mean.len() {
            return Err(A3cError::ActionDimension {
                expected: params.mean.len(),
                actual: action.len(),
            });
        }
        Ok(Self {
            mean: prediction.mean,
            variance: prediction.variance,
            value: prediction.value,
            value_estimate: params.value,
            action,
            reward,
        })
    }

    pub fn action_dim(&self) -> usize {
        self.action.len()
    }
}
