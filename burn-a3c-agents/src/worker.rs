use std::sync::Arc;

use burn::{
    optim::GradientsParams,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use burn_a3c::{
    data::{trajectory::TrajectoryBuffer, transition::Transition},
    environment::Environment,
    error::{A3cError, Result},
    module::{component::GaussianActorCritic, exploration::Policy, replica::ParameterLayout},
    objective::{
        actor_critic::{ActorCriticLoss, LossBreakdown},
        advantage::AdvantageEstimates,
    },
    optim::clip_grad_norm,
    shared::{ParameterStore, SharedTrainingStateHandle},
};

use crate::config::{WorkerConfig, WorkerFactory};

type Observation<B, F> = <<F as WorkerFactory<B>>::Task as Environment>::O;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub steps: usize,
    /// Sum of the raw, unclipped rewards.
    pub total_reward: f64,
}

/// What a single update did.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub segment_length: usize,
    pub bootstrap: f32,
    pub terminal: bool,
    pub estimates: AdvantageEstimates,
    pub loss: LossBreakdown,
    /// Gradient norm measured before clipping.
    pub gradient_norm: f32,
    pub transplanted: usize,
    pub short_circuited: bool,
    /// False when the optimizer step found no gradient attached.
    pub stepped: bool,
}

/// One A3C worker: a private replica of the global network, a task and a
/// policy, driven episode by episode.
pub struct AsyncActorCriticWorker<B: AutodiffBackend, F: WorkerFactory<B>> {
    id: usize,
    config: WorkerConfig,
    loss: ActorCriticLoss,
    global: Arc<ParameterStore<B, F::Model>>,
    shared: SharedTrainingStateHandle,
    network: F::Model,
    task: F::Task,
    policy: F::Policy,
    optimizer: F::Optim,
    buffer: TrajectoryBuffer<B>,
    update_count: usize,
    last_update: Option<UpdateReport>,
}

impl<B: AutodiffBackend, F: WorkerFactory<B>> AsyncActorCriticWorker<B, F> {
    pub fn new(
        id: usize,
        config: WorkerConfig,
        factory: &F,
        global: Arc<ParameterStore<B, F::Model>>,
        shared: SharedTrainingStateHandle,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;
        let loss = config.loss()?;

        let network = factory.network(device)?;
        global
            .layout()
            .check_compatible(&ParameterLayout::of(&network))?;
        let network = global.pull(network)?;

        Ok(Self {
            id,
            loss,
            buffer: TrajectoryBuffer::new(config.update_interval),
            config,
            global,
            shared,
            network,
            task: factory.task(id),
            policy: factory.policy(id),
            optimizer: factory.optimizer(),
            update_count: 0,
            last_update: None,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn network(&self) -> &F::Model {
        &self.network
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }

    pub fn last_update(&self) -> Option<&UpdateReport> {
        self.last_update.as_ref()
    }

    /// Overwrites the replica with the current global parameters.
    pub fn refresh(&mut self) -> Result<()> {
        self.network = self.global.pull(self.network.clone())?;
        Ok(())
    }

    /// Runs one episode. In deterministic mode the policy acts with its mean
    /// and nothing is learned or counted.
    pub fn episode(&mut self, deterministic: bool) -> Result<EpisodeOutcome> {
        let mut observation = self.task.reset(None)?;
        let mut steps = 0;
        let mut total_reward = 0.0;
        self.buffer.clear();

        while !self.shared.should_stop()
            && self
                .config
                .max_episode_length
                .map_or(true, |cap| steps < cap)
        {
            let prediction = self.network.predict(&vec![observation.clone()]);
            let params = prediction.params()?;
            let action = self
                .policy
                .sample(&params.mean, &params.variance, deterministic);
            let (next_observation, reward, terminal) = self.task.step(action.clone())?;
            if !reward.is_finite() {
                return Err(A3cError::MalformedReward(reward));
            }

            steps += 1;
            total_reward += reward;

            if deterministic {
                if terminal {
                    break;
                }
                observation = next_observation;
                continue;
            }

            let reward = reward.clamp(-1.0, 1.0) as f32;
            self.buffer
                .push(Transition::new(prediction, &params, action, reward)?);
            self.shared.increment_steps();

            if terminal || self.buffer.is_full() {
                self.update(&next_observation, terminal)?;
            }
            if terminal {
                break;
            }
            observation = next_observation;
        }

        if !self.buffer.is_empty() {
            log::warn!(
                "worker {} discarded {} transitions left when the episode loop stopped",
                self.id,
                self.buffer.len()
            );
            self.buffer.clear();
        }

        log::info!(
            "worker {} {} episode: {} steps, reward {:.3}",
            self.id,
            if deterministic { "evaluation" } else { "training" },
            steps,
            total_reward
        );
        Ok(EpisodeOutcome {
            steps,
            total_reward,
        })
    }

    fn update(&mut self, next_observation: &Observation<B, F>, terminal: bool) -> Result<()> {
        let bootstrap = if terminal {
            0.0
        } else {
            let value = self.network.critic(&vec![next_observation.clone()]);
            value.slice([0..1, 0..1]).into_scalar().elem::<f32>()
        };

        let rewards = self.buffer.rewards();
        let values = self.buffer.values();
        let segment = self.buffer.take();
        let estimates = self.loss.estimator().estimate(&rewards, &values, bootstrap);

        let output = self.loss.forward(&segment, &estimates)?;
        let breakdown = output.breakdown();
        if !breakdown.total.is_finite() {
            return Err(A3cError::NonFiniteLoss(breakdown.total));
        }

        // Fresh gradients per backward pass, nothing stale on the replica.
        let grads = output.total.backward();
        let mut grads = GradientsParams::from_grads(grads, &self.network);
        let gradient_norm =
            clip_grad_norm(&self.network, &mut grads, self.config.gradient_clip as f32)?;

        let session = self.global.begin_update();
        session.zero_grad();
        let outcome = session.transplant(&self.network, grads);
        let stepped = session.step(&mut self.optimizer, self.config.learning_rate);
        drop(session);

        self.refresh()?;
        self.network.reset(terminal);
        self.update_count += 1;

        log::debug!(
            "worker {} update {}: {} steps, bootstrap {:.4}, loss {:.4} (policy {:.4}, entropy {:.4}, value {:.4}), grad norm {:.4}, {} gradients transplanted",
            self.id,
            self.update_count,
            segment.len(),
            bootstrap,
            breakdown.total,
            breakdown.policy,
            breakdown.entropy,
            breakdown.value,
            gradient_norm,
            outcome.transplanted
        );

        self.last_update = Some(UpdateReport {
            segment_length: segment.len(),
            bootstrap,
            terminal,
            estimates,
            loss: breakdown,
            gradient_norm,
            transplanted: outcome.transplanted,
            short_circuited: outcome.short_circuited,
            stepped,
        });
        Ok(())
    }
}
