//! Advantage and return estimation over one update segment.
//!
//! A single backward sweep produces, for every step `i` of the segment:
//!
//! ```text
//! delta_i = r_i + discount * next_value - V(s_i)
//! A_i     = discount * gae_tau * A_{i+1} + delta_i
//! R_i     = r_i + discount * R_{i+1}
//! ```
//!
//! `next_value` is the bootstrap for the last step and the stored value
//! estimate of step `i + 1` otherwise. The return recursion starts from the
//! bootstrap and is independent of the advantage recursion.

#[derive(Debug, Clone, PartialEq)]
pub struct AdvantageEstimates {
    pub advantages: Vec<f32>,
    pub returns: Vec<f32>,
}

impl AdvantageEstimates {
    pub fn len(&self) -> usize {
        self.advantages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advantages.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdvantageEstimator {
    discount: f32,
    gae_tau: f32,
}

impl AdvantageEstimator {
    pub fn new(discount: f64, gae_tau: f64) -> Self {
        Self {
            discount: discount as f32,
            gae_tau: gae_tau as f32,
        }
    }

    /// `bootstrap` is 0 when the segment ended on a terminal step.
    pub fn estimate(&self, rewards: &[f32], values: &[f32], bootstrap: f32) -> AdvantageEstimates {
        debug_assert_eq!(rewards.len(), values.len());
        let n = rewards.len().min(values.len());

        let mut advantages = vec![0.0f32; n];
        let mut returns = vec![0.0f32; n];
        let mut gae = 0.0f32;
        let mut ret = bootstrap;

        for i in (0..n).rev() {
            let next_value = if i + 1 == n { bootstrap } else { values[i + 1] };
            // Non-final successors are discounted too. The classic async worker
            // adds the stored successor value undiscounted.
            let delta = rewards[i] + self.discount * next_value - values[i];
            gae = self.discount * self.gae_tau * gae + delta;
            ret = rewards[i] + self.discount * ret;
            advantages[i] = gae;
            returns[i] = ret;
        }

        AdvantageEstimates {
            advantages,
            returns,
        }
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn test_single_step_segment() {
        let estimator = AdvantageEstimator::new(0.9, 0.95);
        let (reward, value, bootstrap) = (1.0, 0.5, 2.0);

        let estimates = estimator.estimate(&[reward], &[value], bootstrap);
        assert!((estimates.advantages[0] - (reward + 0.9 * bootstrap - value)).abs() < 1e-6);
        assert!((estimates.returns[0] - (reward + 0.9 * bootstrap)).abs() < 1e-6);

        // Terminal: the bootstrap is zero for both recursions.
        let estimates = estimator.estimate(&[reward], &[value], 0.0);
        assert!((estimates.advantages[0] - (reward - value)).abs() < 1e-6);
        assert!((estimates.returns[0] - reward).abs() < 1e-6);
    }

    #[test]
    fn test_outputs_are_aligned() {
        let estimator = AdvantageEstimator::new(0.99, 1.0);
        for n in 1..6 {
            let rewards = vec![0.5; n];
            let values = (0..n).map(|i| i as f32 * 0.1).collect::<Vec<_>>();
            let estimates = estimator.estimate(&rewards, &values, 0.3);
            assert_eq!(estimates.len(), n);
            assert_eq!(estimates.returns.len(), n);
        }
        assert!(estimator.estimate(&[], &[], 1.0).is_empty());
    }

    #[test]
    fn test_residual_uses_stored_successor_value() {
        // gae_tau = 0 isolates the one-step residuals.
        let estimator = AdvantageEstimator::new(0.5, 0.0);
        let estimates = estimator.estimate(&[1.0, 1.0, 1.0], &[0.25, 0.5, 1.0], 4.0);
        let expected = expect![[r#"
            AdvantageEstimates {
                advantages: [
                    1.0,
                    1.0,
                    2.0,
                ],
                returns: [
                    2.25,
                    2.5,
                    3.0,
                ],
            }
        "#]];
        expected.assert_debug_eq(&estimates);
    }

    #[test]
    fn test_terminal_segment_returns() {
        // Four clipped rewards of 1 ending on a terminal step.
        let estimator = AdvantageEstimator::new(0.5, 1.0);
        let estimates = estimator.estimate(&[1.0; 4], &[0.0; 4], 0.0);
        let expected = expect![[r#"
            AdvantageEstimates {
                advantages: [
                    1.875,
                    1.75,
                    1.5,
                    1.0,
                ],
                returns: [
                    1.875,
                    1.75,
                    1.5,
                    1.0,
                ],
            }
        "#]];
        expected.assert_debug_eq(&estimates);
    }
}
