use std::marker::PhantomData;

use burn::{
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use burn_a3c::{
    environment::pendulum::{Pendulum, ACTION_SIZE, OBSERVATION_SIZE},
    error::Result as A3cResult,
    module::{
        exploration::GaussianPolicy,
        nn::gaussian_actor_critic::{GaussianActorCriticConfig, GaussianActorCriticModel},
    },
};
use rand::{rngs::StdRng, SeedableRng};

use crate::config::WorkerFactory;

const MAX_TORQUE: f32 = 2.0;

/// Pendulum swing-up with the reference Gaussian actor-critic and Adam.
#[derive(Config, Debug)]
pub struct PendulumFactoryConfig {
    #[config(default = 200)]
    pub episode_length: usize,
    #[config(default = 0)]
    pub seed: u64,
    #[config(default = "vec![64, 64]")]
    pub hidden_sizes: Vec<usize>,
    #[config(default = 64)]
    pub feature_size: usize,
}

pub struct PendulumFactory<B: AutodiffBackend> {
    config: PendulumFactoryConfig,
    backend: PhantomData<B>,
}

impl PendulumFactoryConfig {
    pub fn init<B: AutodiffBackend>(&self) -> PendulumFactory<B> {
        PendulumFactory {
            config: self.clone(),
            backend: PhantomData,
        }
    }
}

impl<B: AutodiffBackend> WorkerFactory<B> for PendulumFactory<B> {
    type Task = Pendulum;
    type Model = GaussianActorCriticModel<B>;
    type Policy = GaussianPolicy<StdRng>;
    type Optim = OptimizerAdaptor<Adam<B::InnerBackend>, Self::Model, B>;

    fn task(&self, worker_id: usize) -> Self::Task {
        Pendulum::new(
            self.config.episode_length,
            self.config.seed.wrapping_add(worker_id as u64),
        )
    }

    fn network(&self, device: &B::Device) -> A3cResult<Self::Model> {
        GaussianActorCriticConfig::new(OBSERVATION_SIZE, ACTION_SIZE)
            .with_hidden_sizes(self.config.hidden_sizes.clone())
            .with_feature_size(self.config.feature_size)
            .try_init(device)
    }

    fn policy(&self, worker_id: usize) -> Self::Policy {
        let seed = self.config.seed.wrapping_add(1_000 + worker_id as u64);
        GaussianPolicy::new(StdRng::seed_from_u64(seed)).with_bounds(-MAX_TORQUE, MAX_TORQUE)
    }

    fn optimizer(&self) -> Self::Optim {
        AdamConfig::new().init()
    }
}
