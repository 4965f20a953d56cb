/// Rewards of deterministic evaluation episodes.
#[derive(Debug, Clone, Default)]
pub struct EvaluationStatistics {
    rewards: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSummary {
    pub episodes: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl EvaluationStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, episode_reward: f64) {
        self.rewards.push(episode_reward);
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn summary(&self) -> Option<EvaluationSummary> {
        if self.rewards.is_empty() {
            return None;
        }
        let sum: f64 = self.rewards.iter().sum();
        let min = self.rewards.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(EvaluationSummary {
            episodes: self.rewards.len(),
            mean: sum / self.rewards.len() as f64,
            min,
            max,
        })
    }

    /// Logs the summary at `info` level under `label`.
    pub fn report(&self, label: &str) -> Option<EvaluationSummary> {
        let summary = self.summary()?;
        log::info!(
            "{label}: {} episodes, reward mean {:.3} min {:.3} max {:.3}",
            summary.episodes,
            summary.mean,
            summary.min,
            summary.max
        );
        Some(summary)
    }
}
