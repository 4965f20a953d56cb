use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softplus, tanh},
};

use crate::{
    error::Result as A3cResult,
    module::component::{GaussianActorCritic, GaussianPrediction},
};

use super::multi_layer_perceptron::{MultiLayerPerceptron, MultiLayerPerceptronConfig};

/// Lower bound added to the softplus variance head.
const MIN_VARIANCE: f64 = 1e-4;

#[derive(Config, Debug)]
pub struct GaussianActorCriticConfig {
    observation_size: usize,
    action_size: usize,
    #[config(default = "vec![64, 64]")]
    hidden_sizes: Vec<usize>,
    #[config(default = 64)]
    feature_size: usize,
}

/// Shared trunk with mean, variance and value heads.
#[derive(Module, Debug)]
pub struct GaussianActorCriticModel<B: Backend> {
    trunk: MultiLayerPerceptron<B>,
    mean_head: Linear<B>,
    variance_head: Linear<B>,
    value_head: Linear<B>,
}

impl GaussianActorCriticConfig {
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> A3cResult<GaussianActorCriticModel<B>> {
        let trunk = MultiLayerPerceptronConfig::new(
            self.observation_size,
            self.hidden_sizes.clone(),
            self.feature_size,
        )
        .try_init(device)?;
        Ok(GaussianActorCriticModel {
            trunk,
            mean_head: LinearConfig::new(self.feature_size, self.action_size).init(device),
            variance_head: LinearConfig::new(self.feature_size, self.action_size).init(device),
            value_head: LinearConfig::new(self.feature_size, 1).init(device),
        })
    }
}

impl<B: Backend> GaussianActorCriticModel<B> {
    fn features(&self, observations: &[Vec<f32>]) -> Tensor<B, 2> {
        let device = &self.devices()[0];
        let rows = observations.len();
        let columns = observations.first().map_or(0, |o| o.len());
        let flat = observations.iter().flatten().copied().collect::<Vec<f32>>();
        let input = Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows, columns]);
        tanh(self.trunk.forward(input))
    }
}

impl<B: Backend> GaussianActorCritic<B> for GaussianActorCriticModel<B> {
    type OBatch = Vec<Vec<f32>>;

    fn predict(&self, observations: &Self::OBatch) -> GaussianPrediction<B> {
        let phi = self.features(observations);
        GaussianPrediction {
            mean: tanh(self.mean_head.forward(phi.clone())),
            variance: softplus(self.variance_head.forward(phi.clone()), 1.0)
                .add_scalar(MIN_VARIANCE),
            value: self.value_head.forward(phi),
        }
    }

    fn critic(&self, observations: &Self::OBatch) -> Tensor<B, 2> {
        self.value_head.forward(self.features(observations))
    }
}
