use burn::{
    config::Config,
    module::AutodiffModule,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};
use burn_a3c::{
    environment::Environment,
    error::{A3cError, Result as A3cResult},
    module::{component::GaussianActorCritic, exploration::Policy},
    objective::actor_critic::{ActorCriticLoss, ActorCriticLossConfig},
};

/// Hyperparameters of a single worker, read-only for its lifetime.
#[derive(Config, Debug)]
pub struct WorkerConfig {
    #[config(default = 0.99)]
    pub discount: f64,
    #[config(default = 1.0)]
    pub gae_tau: f64,
    #[config(default = 0.01)]
    pub entropy_weight: f64,
    /// Maximum joint L2 norm of the worker gradients.
    #[config(default = 40.0)]
    pub gradient_clip: f64,
    /// Segment length that triggers an update when no terminal step comes first.
    #[config(default = 5)]
    pub update_interval: usize,
    /// Step cap per episode, unlimited when unset.
    pub max_episode_length: Option<usize>,
    #[config(default = 1e-4)]
    pub learning_rate: f64,
}

impl WorkerConfig {
    pub fn validate(&self) -> A3cResult<()> {
        if self.update_interval == 0 {
            return Err(A3cError::Configuration(
                "update interval should be at least 1".to_string(),
            ));
        }
        if !(self.gradient_clip.is_finite() && self.gradient_clip > 0.0) {
            return Err(A3cError::Configuration(format!(
                "gradient clip should be positive, got {}",
                self.gradient_clip
            )));
        }
        if !self.learning_rate.is_finite() {
            return Err(A3cError::Configuration(format!(
                "learning rate should be finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    pub fn loss(&self) -> A3cResult<ActorCriticLoss> {
        ActorCriticLossConfig::new()
            .with_discount(self.discount)
            .with_gae_tau(self.gae_tau)
            .with_entropy_weight(self.entropy_weight)
            .init()
    }
}

/// Builds everything a worker owns. Each method is called once per worker.
///
/// The optimizer is only ever stepped against the global network held by the
/// parameter store.
pub trait WorkerFactory<B: AutodiffBackend> {
    type Task: Environment<A = Vec<f32>>;
    type Model: AutodiffModule<B>
        + GaussianActorCritic<B, OBatch = Vec<<Self::Task as Environment>::O>>;
    type Policy: Policy;
    type Optim: Optimizer<Self::Model, B>;

    fn task(&self, worker_id: usize) -> Self::Task;

    fn network(&self, device: &B::Device) -> A3cResult<Self::Model>;

    fn policy(&self, worker_id: usize) -> Self::Policy;

    fn optimizer(&self) -> Self::Optim;
}
