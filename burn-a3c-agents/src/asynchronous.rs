use std::{sync::Arc, thread::JoinHandle, time::Duration};

use burn::{config::Config, tensor::backend::AutodiffBackend};
use burn_a3c::{
    error::{A3cError, Result as A3cResult},
    logging::{EvaluationStatistics, EvaluationSummary},
    shared::{
        ParameterStore, ParameterStoreConfig, SharedTrainingState, SharedTrainingStateHandle,
        SyncStatistics,
    },
};
use tqdm::tqdm;

use crate::{
    config::{WorkerConfig, WorkerFactory},
    worker::AsyncActorCriticWorker,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Config, Debug)]
pub struct AsyncTrainerConfig {
    #[config(default = 4)]
    pub n_workers: usize,
    /// Training stops once the workers took this many steps in total.
    #[config(default = 100_000)]
    pub max_steps: u64,
    /// Total steps between evaluation rounds.
    #[config(default = 10_000)]
    pub evaluation_interval: u64,
    #[config(default = 5)]
    pub evaluation_episodes: usize,
    /// Step cap of an evaluation episode, on top of the worker's own cap.
    #[config(default = 1_000)]
    pub evaluation_episode_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: usize,
    pub episodes: usize,
    pub steps: usize,
    pub updates: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub total_steps: u64,
    pub workers: Vec<WorkerSummary>,
    pub evaluations: Vec<EvaluationSummary>,
    pub sync: SyncStatistics,
}

pub struct TrainingResult<M> {
    pub model: M,
    pub summary: TrainingSummary,
}

/// Runs `n_workers` training threads against one global network and
/// evaluates the global network from the calling thread.
pub struct AsyncTrainer<B: AutodiffBackend, F: WorkerFactory<B>> {
    config: AsyncTrainerConfig,
    worker_config: WorkerConfig,
    store_config: ParameterStoreConfig,
    factory: Arc<F>,
    device: B::Device,
}

impl AsyncTrainerConfig {
    pub fn init<B: AutodiffBackend, F: WorkerFactory<B>>(
        &self,
        worker_config: WorkerConfig,
        store_config: ParameterStoreConfig,
        factory: F,
        device: B::Device,
    ) -> A3cResult<AsyncTrainer<B, F>> {
        if self.n_workers == 0 {
            return Err(A3cError::Configuration(
                "at least one worker is required".to_string(),
            ));
        }
        if self.evaluation_episode_length == 0 {
            return Err(A3cError::Configuration(
                "evaluation episode length should be at least 1".to_string(),
            ));
        }
        if self.evaluation_interval == 0 {
            return Err(A3cError::Configuration(
                "evaluation interval should be at least 1".to_string(),
            ));
        }
        worker_config.validate()?;
        Ok(AsyncTrainer {
            config: self.clone(),
            worker_config,
            store_config,
            factory: Arc::new(factory),
            device,
        })
    }
}

impl<B, F> AsyncTrainer<B, F>
where
    B: AutodiffBackend,
    F: WorkerFactory<B> + Send + Sync + 'static,
{
    pub fn train(&self) -> A3cResult<TrainingResult<F::Model>> {
        let global = Arc::new(self.store_config.init(self.factory.network(&self.device)?));
        let shared = SharedTrainingState::shared();

        // The evaluator never takes a training step, so it gets its own state
        // and keeps working after the workers are told to stop.
        let evaluation_length = self
            .worker_config
            .max_episode_length
            .map_or(self.config.evaluation_episode_length, |cap| {
                cap.min(self.config.evaluation_episode_length)
            });
        let mut evaluator = AsyncActorCriticWorker::new(
            self.config.n_workers,
            self.worker_config
                .clone()
                .with_max_episode_length(Some(evaluation_length)),
            self.factory.as_ref(),
            Arc::clone(&global),
            SharedTrainingState::shared(),
            &self.device,
        )?;

        let mut handles = Vec::with_capacity(self.config.n_workers);
        for id in 0..self.config.n_workers {
            match self.spawn_worker(id, &global, &shared) {
                Ok(handle) => handles.push((id, handle)),
                Err(err) => {
                    shared.request_stop();
                    join_workers(handles);
                    return Err(err);
                }
            }
        }
        log::info!(
            "started {} workers, {:?} gradient sync",
            handles.len(),
            global.mode()
        );

        let evaluations = self.drive(&mut evaluator, &shared, &handles);
        shared.request_stop();
        let (workers, worker_error) = join_workers(handles);
        let evaluations = evaluations?;
        if let Some(err) = worker_error {
            return Err(err);
        }

        let summary = TrainingSummary {
            total_steps: shared.total_steps(),
            workers,
            evaluations,
            sync: global.statistics(),
        };
        log::info!(
            "training finished after {} steps, {} global updates",
            summary.total_steps,
            summary.sync.steps
        );
        Ok(TrainingResult {
            model: global.snapshot(),
            summary,
        })
    }

    fn spawn_worker(
        &self,
        id: usize,
        global: &Arc<ParameterStore<B, F::Model>>,
        shared: &SharedTrainingStateHandle,
    ) -> A3cResult<JoinHandle<A3cResult<WorkerSummary>>> {
        let factory = Arc::clone(&self.factory);
        let global = Arc::clone(global);
        let shared = Arc::clone(shared);
        let config = self.worker_config.clone();
        let device = self.device.clone();

        let handle = std::thread::Builder::new()
            .name(format!("a3c-worker-{id}"))
            .spawn(move || {
                let result = run_worker(id, config, factory.as_ref(), global, &shared, &device);
                if let Err(err) = &result {
                    log::error!("worker {id} stopped: {err}");
                    shared.request_stop();
                }
                result
            })?;
        Ok(handle)
    }

    /// Waits for each evaluation threshold and evaluates the global network.
    fn drive(
        &self,
        evaluator: &mut AsyncActorCriticWorker<B, F>,
        shared: &SharedTrainingState,
        handles: &[(usize, JoinHandle<A3cResult<WorkerSummary>>)],
    ) -> A3cResult<Vec<EvaluationSummary>> {
        let interval = self.config.evaluation_interval;
        let rounds = self.config.max_steps.div_ceil(interval);
        let mut evaluations = Vec::new();

        for round in tqdm(0..rounds) {
            let target = ((round + 1) * interval).min(self.config.max_steps);
            while shared.total_steps() < target
                && !shared.should_stop()
                && !handles.iter().all(|(_, handle)| handle.is_finished())
            {
                std::thread::sleep(POLL_INTERVAL);
            }

            evaluator.refresh()?;
            let mut statistics = EvaluationStatistics::new();
            for _ in 0..self.config.evaluation_episodes {
                statistics.push(evaluator.episode(true)?.total_reward);
            }
            let label = format!("evaluation after {} steps", shared.total_steps());
            evaluations.extend(statistics.report(&label));

            if shared.should_stop() || handles.iter().all(|(_, handle)| handle.is_finished()) {
                break;
            }
        }
        Ok(evaluations)
    }
}

fn run_worker<B: AutodiffBackend, F: WorkerFactory<B>>(
    id: usize,
    config: WorkerConfig,
    factory: &F,
    global: Arc<ParameterStore<B, F::Model>>,
    shared: &SharedTrainingStateHandle,
    device: &B::Device,
) -> A3cResult<WorkerSummary> {
    let mut worker =
        AsyncActorCriticWorker::new(id, config, factory, global, Arc::clone(shared), device)?;
    let mut summary = WorkerSummary {
        id: worker.id(),
        episodes: 0,
        steps: 0,
        updates: 0,
    };
    while !shared.should_stop() {
        let outcome = worker.episode(false)?;
        summary.episodes += 1;
        summary.steps += outcome.steps;
    }
    summary.updates = worker.update_count();
    Ok(summary)
}

/// Joins every worker, keeping the first failure.
fn join_workers(
    handles: Vec<(usize, JoinHandle<A3cResult<WorkerSummary>>)>,
) -> (Vec<WorkerSummary>, Option<A3cError>) {
    let mut summaries = Vec::with_capacity(handles.len());
    let mut first_error = None;
    for (id, handle) in handles {
        match handle.join() {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(_) => {
                first_error.get_or_insert(A3cError::WorkerPanicked(id));
            }
        }
    }
    (summaries, first_error)
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use burn_a3c::shared::GradientSyncMode;

    use super::*;
    use crate::pendulum::PendulumFactoryConfig;

    type B = Autodiff<NdArray>;

    fn factory() -> crate::pendulum::PendulumFactory<B> {
        PendulumFactoryConfig::new()
            .with_episode_length(20)
            .with_hidden_sizes(vec![16])
            .with_feature_size(16)
            .init()
    }

    #[test]
    fn test_trainer_runs_to_step_budget() {
        let trainer = AsyncTrainerConfig::new()
            .with_n_workers(2)
            .with_max_steps(200)
            .with_evaluation_interval(100)
            .with_evaluation_episodes(1)
            .init::<B, _>(
                WorkerConfig::new(),
                ParameterStoreConfig::new(),
                factory(),
                Default::default(),
            )
            .unwrap();

        let result = trainer.train().unwrap();
        let summary = result.summary;
        assert!(summary.total_steps >= 200);
        assert_eq!(summary.workers.len(), 2);
        assert_eq!(summary.evaluations.len(), 2);
        assert!(summary.evaluations.iter().all(|e| e.episodes == 1));
        assert!(summary.sync.steps > 0);
        let worker_steps: usize = summary.workers.iter().map(|w| w.steps).sum();
        assert_eq!(worker_steps as u64, summary.total_steps);
    }

    #[test]
    fn test_trainer_strict_mode() {
        let trainer = AsyncTrainerConfig::new()
            .with_n_workers(3)
            .with_max_steps(120)
            .with_evaluation_interval(120)
            .with_evaluation_episodes(1)
            .init::<B, _>(
                WorkerConfig::new().with_update_interval(4),
                ParameterStoreConfig::new().with_mode(GradientSyncMode::Strict),
                factory(),
                Default::default(),
            )
            .unwrap();

        let summary = trainer.train().unwrap().summary;
        // Sessions never overlap, so every transplant found empty slots.
        assert_eq!(summary.sync.short_circuits, 0);
        assert_eq!(summary.sync.empty_steps, 0);
        let updates: usize = summary.workers.iter().map(|w| w.updates).sum();
        assert_eq!(summary.sync.steps, updates);
    }

    #[test]
    fn test_evaluation_is_capped_on_endless_tasks() {
        let factory = PendulumFactoryConfig::new()
            .with_episode_length(usize::MAX)
            .with_hidden_sizes(vec![8])
            .with_feature_size(8)
            .init();
        let trainer = AsyncTrainerConfig::new()
            .with_n_workers(2)
            .with_max_steps(60)
            .with_evaluation_interval(60)
            .with_evaluation_episodes(2)
            .with_evaluation_episode_length(15)
            .init::<B, _>(
                WorkerConfig::new(),
                ParameterStoreConfig::new(),
                factory,
                Default::default(),
            )
            .unwrap();

        let summary = trainer.train().unwrap().summary;
        assert_eq!(summary.evaluations.len(), 1);
        assert_eq!(summary.evaluations[0].episodes, 2);
        assert!(summary.total_steps >= 60);
    }

    #[test]
    fn test_trainer_rejects_zero_workers() {
        let result = AsyncTrainerConfig::new().with_n_workers(0).init::<B, _>(
            WorkerConfig::new(),
            ParameterStoreConfig::new(),
            factory(),
            Default::default(),
        );
        assert!(matches!(result, Err(A3cError::Configuration(_))));
    }
}
