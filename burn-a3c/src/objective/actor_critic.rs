use burn::{
    prelude::*,
    tensor::{ElementConversion, Tensor},
};

use crate::{
    data::transition::Transition,
    error::{A3cError, Result as A3cResult},
};

use super::{
    advantage::{AdvantageEstimates, AdvantageEstimator},
    gaussian::{gaussian_density, gaussian_entropy},
};

#[derive(Config, Debug)]
pub struct ActorCriticLossConfig {
    #[config(default = 0.99)]
    pub discount: f64,
    #[config(default = 1.0)]
    pub gae_tau: f64,
    #[config(default = 0.01)]
    pub entropy_weight: f64,
}

impl ActorCriticLossConfig {
    pub fn init(&self) -> A3cResult<ActorCriticLoss> {
        self.validate()?;
        Ok(ActorCriticLoss {
            estimator: AdvantageEstimator::new(self.discount, self.gae_tau),
            entropy_weight: self.entropy_weight as f32,
        })
    }

    fn validate(&self) -> A3cResult<()> {
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(A3cError::Configuration(format!(
                "the discount factor should be in the interval [0,1], got {}",
                self.discount
            )));
        }
        if !(0.0..=1.0).contains(&self.gae_tau) {
            return Err(A3cError::Configuration(format!(
                "gae_tau should be in the interval [0,1], got {}",
                self.gae_tau
            )));
        }
        if !self.entropy_weight.is_finite() {
            return Err(A3cError::Configuration(format!(
                "entropy weight should be finite, got {}",
                self.entropy_weight
            )));
        }
        Ok(())
    }
}

/// Composite actor-critic objective summed over a segment.
///
/// Per transition the loss adds `-log N(a; mu, var) * A`, the entropy of the
/// policy scaled by `entropy_weight`, and `0.5 (R - V)^2`. Advantages and
/// returns enter as constants.
#[derive(Debug, Clone)]
pub struct ActorCriticLoss {
    estimator: AdvantageEstimator,
    entropy_weight: f32,
}

#[derive(Debug, Clone)]
pub struct ActorCriticLossOutput<B: Backend> {
    pub total: Tensor<B, 1>,
    pub policy: Tensor<B, 1>,
    pub entropy: Tensor<B, 1>,
    pub value: Tensor<B, 1>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    pub total: f32,
    pub policy: f32,
    pub entropy: f32,
    pub value: f32,
}

impl<B: Backend> ActorCriticLossOutput<B> {
    pub fn breakdown(&self) -> LossBreakdown {
        LossBreakdown {
            total: scalar(&self.total),
            policy: scalar(&self.policy),
            entropy: scalar(&self.entropy),
            value: scalar(&self.value),
        }
    }
}

fn scalar<B: Backend>(tensor: &Tensor<B, 1>) -> f32 {
    tensor.clone().into_scalar().elem::<f32>()
}

impl ActorCriticLoss {
    pub fn estimator(&self) -> &AdvantageEstimator {
        &self.estimator
    }

    pub fn forward<B: Backend>(
        &self,
        transitions: &[Transition<B>],
        estimates: &AdvantageEstimates,
    ) -> A3cResult<ActorCriticLossOutput<B>> {
        let n = transitions.len();
        if n == 0 || estimates.len() != n || estimates.returns.len() != n {
            return Err(A3cError::SegmentMismatch {
                transitions: n,
                estimates: estimates.len(),
            });
        }
        let action_dim = transitions[0].action_dim();
        if let Some(t) = transitions.iter().find(|t| t.action_dim() != action_dim) {
            return Err(A3cError::ActionDimension {
                expected: action_dim,
                actual: t.action_dim(),
            });
        }
        let device = transitions[0].mean.device();

        let means = Tensor::cat(transitions.iter().map(|t| t.mean.clone()).collect(), 0);
        let variances = Tensor::cat(transitions.iter().map(|t| t.variance.clone()).collect(), 0);
        let values = Tensor::cat(transitions.iter().map(|t| t.value.clone()).collect(), 0);

        let actions = transitions
            .iter()
            .flat_map(|t| t.action.iter().copied())
            .collect::<Vec<f32>>();
        let actions =
            Tensor::<B, 1>::from_floats(actions.as_slice(), &device).reshape([n, action_dim]);
        let advantages =
            Tensor::<B, 1>::from_floats(estimates.advantages.as_slice(), &device).reshape([n, 1]);
        let returns =
            Tensor::<B, 1>::from_floats(estimates.returns.as_slice(), &device).reshape([n, 1]);

        let log_likelihood = gaussian_density(actions, means, variances.clone())
            .log()
            .sum_dim(1);
        let policy = log_likelihood.neg().mul(advantages).sum();
        let entropy = gaussian_entropy(variances).sum();
        let value = returns.sub(values).powf_scalar(2.0).mul_scalar(0.5).sum();

        let total = policy.clone() + entropy.clone().mul_scalar(self.entropy_weight) + value.clone();
        Ok(ActorCriticLossOutput {
            total,
            policy,
            entropy,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use burn::backend::{Autodiff, NdArray};

    use super::*;

    fn transition<B: Backend>(
        mean: f32,
        variance: f32,
        value: f32,
        action: f32,
        device: &B::Device,
    ) -> Transition<B> {
        Transition {
            mean: Tensor::from_floats([[mean]], device),
            variance: Tensor::from_floats([[variance]], device),
            value: Tensor::from_floats([[value]], device),
            value_estimate: value,
            action: vec![action],
            reward: 0.0,
        }
    }

    fn estimates(advantages: Vec<f32>, returns: Vec<f32>) -> AdvantageEstimates {
        AdvantageEstimates {
            advantages,
            returns,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(ActorCriticLossConfig::new().init().is_ok());
        assert!(ActorCriticLossConfig::new().with_discount(1.5).init().is_err());
        assert!(ActorCriticLossConfig::new().with_gae_tau(-0.1).init().is_err());
        assert!(ActorCriticLossConfig::new()
            .with_entropy_weight(f64::NAN)
            .init()
            .is_err());
    }

    #[test]
    fn test_loss_components() {
        let device = &Default::default();
        let loss = ActorCriticLossConfig::new()
            .with_entropy_weight(0.5)
            .init()
            .unwrap();
        let transitions = vec![transition::<NdArray>(0.0, 1.0, 1.0, 0.0, device)];

        let output = loss
            .forward(&transitions, &estimates(vec![2.0], vec![3.0]))
            .unwrap()
            .breakdown();

        let log_density = -0.5 * (2.0 * PI).ln();
        let entropy = 0.5 * (1.0 + (2.0 * PI).ln());
        assert!((output.policy - (-log_density * 2.0)).abs() < 1e-5);
        assert!((output.entropy - entropy).abs() < 1e-5);
        assert!((output.value - 2.0).abs() < 1e-5);
        let total = output.policy + 0.5 * entropy + output.value;
        assert!((output.total - total).abs() < 1e-5);
    }

    #[test]
    fn test_loss_sums_over_segment() {
        let device = &Default::default();
        let loss = ActorCriticLossConfig::new().init().unwrap();
        let single = vec![transition::<NdArray>(0.2, 0.5, 0.1, 0.7, device)];
        let double = vec![single[0].clone(), single[0].clone()];

        let one = loss
            .forward(&single, &estimates(vec![0.3], vec![1.0]))
            .unwrap()
            .breakdown();
        let two = loss
            .forward(&double, &estimates(vec![0.3, 0.3], vec![1.0, 1.0]))
            .unwrap()
            .breakdown();
        assert!((two.total - 2.0 * one.total).abs() < 1e-5);
    }

    #[test]
    fn test_loss_rejects_mismatched_estimates() {
        let device = &Default::default();
        let loss = ActorCriticLossConfig::new().init().unwrap();
        let transitions = vec![transition::<NdArray>(0.0, 1.0, 0.0, 0.0, device)];
        let result = loss.forward(&transitions, &estimates(vec![], vec![]));
        assert!(matches!(
            result,
            Err(A3cError::SegmentMismatch {
                transitions: 1,
                estimates: 0
            })
        ));
    }

    #[test]
    fn test_advantage_is_not_differentiated() {
        type B = Autodiff<NdArray>;
        let device = &Default::default();
        let loss = ActorCriticLossConfig::new()
            .with_entropy_weight(0.0)
            .init()
            .unwrap();
        let value = Tensor::<B, 2>::from_floats([[1.0]], device).require_grad();
        let transitions = vec![Transition {
            mean: Tensor::from_floats([[0.0]], device),
            variance: Tensor::from_floats([[1.0]], device),
            value: value.clone(),
            value_estimate: 1.0,
            action: vec![0.5],
            reward: 0.0,
        }];

        let output = loss
            .forward(&transitions, &estimates(vec![4.0], vec![3.0]))
            .unwrap();
        let grads = output.total.backward();
        // Only the regression term reaches the value: d/dV 0.5 (R - V)^2 = V - R.
        let grad = value.grad(&grads).unwrap().into_scalar().elem::<f32>();
        assert!((grad - (1.0 - 3.0)).abs() < 1e-5);
    }
}
