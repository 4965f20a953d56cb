use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Turns distribution parameters into an action.
pub trait Policy {
    fn sample(&mut self, mean: &[f32], variance: &[f32], deterministic: bool) -> Vec<f32>;
}

/// Diagonal Gaussian sampler. Deterministic mode acts with the mean.
pub struct GaussianPolicy<R: Rng> {
    rng: R,
    bounds: Option<(f32, f32)>,
}

impl<R: Rng> GaussianPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, bounds: None }
    }

    /// Clamp every sampled dimension into `[low, high]`.
    pub fn with_bounds(mut self, low: f32, high: f32) -> Self {
        self.bounds = Some((low, high));
        self
    }
}

impl<R: Rng> Policy for GaussianPolicy<R> {
    fn sample(&mut self, mean: &[f32], variance: &[f32], deterministic: bool) -> Vec<f32> {
        let action = mean.iter().zip(variance).map(|(mu, var)| {
            if deterministic {
                *mu
            } else {
                let noise: f32 = StandardNormal.sample(&mut self.rng);
                mu + var.sqrt() * noise
            }
        });
        match self.bounds {
            Some((low, high)) => action.map(|a| a.clamp(low, high)).collect(),
            None => action.collect(),
        }
    }
}
