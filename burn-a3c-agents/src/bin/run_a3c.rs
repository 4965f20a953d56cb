use burn::backend::{Autodiff, NdArray};
use burn_a3c::shared::{GradientSyncMode, ParameterStoreConfig};
use burn_a3c_agents::{
    asynchronous::AsyncTrainerConfig, config::WorkerConfig, pendulum::PendulumFactoryConfig,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Running asynchronous advantage actor-critic on Pendulum");
    type B = Autodiff<NdArray>;

    let n_workers = std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4);
    let trainer = AsyncTrainerConfig::new()
        .with_n_workers(n_workers)
        .with_max_steps(200_000)
        .with_evaluation_interval(10_000)
        .with_evaluation_episodes(5);
    let worker = WorkerConfig::new()
        .with_discount(0.99)
        .with_gae_tau(1.0)
        .with_entropy_weight(1e-4)
        .with_gradient_clip(40.0)
        .with_update_interval(20)
        .with_learning_rate(1e-4);
    let factory = PendulumFactoryConfig::new().init::<B>();

    let result = trainer
        .init::<B, _>(
            worker,
            ParameterStoreConfig::new().with_mode(GradientSyncMode::Relaxed),
            factory,
            Default::default(),
        )
        .and_then(|trainer| trainer.train());

    match result {
        Ok(result) => {
            let summary = result.summary;
            log::info!(
                "{} steps by {} workers, {} transplant short-circuits",
                summary.total_steps,
                summary.workers.len(),
                summary.sync.short_circuits
            );
            for evaluation in &summary.evaluations {
                log::info!(
                    "evaluation reward mean {:.2} (min {:.2}, max {:.2})",
                    evaluation.mean,
                    evaluation.min,
                    evaluation.max
                );
            }
        }
        Err(err) => {
            log::error!("training failed: {err}");
            std::process::exit(1);
        }
    }
}
