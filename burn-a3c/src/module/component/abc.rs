use burn::{
    prelude::Backend,
    tensor::{ElementConversion, Tensor},
};

use crate::error::{A3cError, Result};

/// Output of the policy and value heads for a batch of observations.
///
/// `mean` and `variance` are `[batch, action_dim]`, `value` is `[batch, 1]`.
#[derive(Debug, Clone)]
pub struct GaussianPrediction<B: Backend> {
    pub mean: Tensor<B, 2>,
    pub variance: Tensor<B, 2>,
    pub value: Tensor<B, 2>,
}

/// Plain copies of a single-observation prediction, used for sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionParams {
    pub mean: Vec<f32>,
    pub variance: Vec<f32>,
    pub value: f32,
}

impl<B: Backend> GaussianPrediction<B> {
    /// Reads the first row back to the host, rejecting variances that are not
    /// strictly positive.
    pub fn params(&self) -> Result<DistributionParams> {
        let mean = row(self.mean.clone())?;
        let variance = row(self.variance.clone())?;
        if let Some((index, variance)) = variance
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(A3cError::NonPositiveVariance {
                index,
                variance: *variance,
            });
        }
        let value = self
            .value
            .clone()
            .slice([0..1, 0..1])
            .into_scalar()
            .elem::<f32>();
        Ok(DistributionParams {
            mean,
            variance,
            value,
        })
    }
}

fn row<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>> {
    let [_, columns] = tensor.dims();
    tensor
        .slice([0..1, 0..columns])
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| A3cError::Tensor(format!("{err:?}")))
}

/// Actor-critic network with a diagonal Gaussian policy head.
pub trait GaussianActorCritic<B: Backend> {
    type OBatch;

    fn predict(&self, observations: &Self::OBatch) -> GaussianPrediction<B>;

    fn critic(&self, observations: &Self::OBatch) -> Tensor<B, 2>;

    /// Episode boundary hook for networks carrying per-episode state.
    fn reset(&mut self, _terminal: bool) {}
}
