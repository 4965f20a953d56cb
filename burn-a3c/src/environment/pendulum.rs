//! Inverted pendulum swing-up with a single continuous torque action.
//!
//! Observation is `[cos(theta), sin(theta), theta_dot]`. There is no failure
//! state, the episode ends after `max_steps` steps.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{Done, Environment, EnvironmentError, Reward};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

pub const OBSERVATION_SIZE: usize = 3;
pub const ACTION_SIZE: usize = 1;

pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    ticks: usize,
    max_steps: usize,
    done: bool,
    rng: StdRng,
}

impl Pendulum {
    pub fn new(max_steps: usize, seed: u64) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            ticks: 0,
            max_steps,
            done: true,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn observation(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(200, 0)
    }
}

fn angle_normalize(x: f32) -> f32 {
    use std::f32::consts::PI;
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl Environment for Pendulum {
    type A = Vec<f32>;
    type O = Vec<f32>;

    fn reset(&mut self, seed: Option<u64>) -> Result<Self::O, EnvironmentError> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.theta = self.rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        self.ticks = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: Self::A) -> Result<(Self::O, Reward, Done), EnvironmentError> {
        if self.done {
            return Err(EnvironmentError::EpisodeFinished);
        }
        if action.len() != ACTION_SIZE {
            return Err(EnvironmentError::InvalidAction {
                expected: ACTION_SIZE,
                actual: action.len(),
            });
        }

        let theta = self.theta;
        let theta_dot = self.theta_dot;
        let torque = action[0].clamp(-MAX_TORQUE, MAX_TORQUE);
        let cost = angle_normalize(theta).powi(2)
            + 0.1 * theta_dot * theta_dot
            + 0.001 * torque * torque;

        let new_theta_dot = (theta_dot
            + (3.0 * G / (2.0 * L) * theta.sin() + 3.0 / (M * L * L) * torque) * DT)
            .clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = angle_normalize(theta + new_theta_dot * DT);
        self.theta_dot = new_theta_dot;

        self.ticks += 1;
        self.done = self.ticks >= self.max_steps;
        Ok((self.observation(), -cost as Reward, self.done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pendulum_episode_is_truncated() {
        let mut env = Pendulum::new(5, 7);
        let observation = env.reset(None).unwrap();
        assert_eq!(observation.len(), OBSERVATION_SIZE);

        let mut steps = 0;
        loop {
            let (observation, reward, done) = env.step(vec![0.5]).unwrap();
            steps += 1;
            assert_eq!(observation.len(), OBSERVATION_SIZE);
            assert!(reward <= 0.0);
            if done {
                break;
            }
        }
        assert_eq!(steps, 5);
        assert!(matches!(
            env.step(vec![0.0]),
            Err(EnvironmentError::EpisodeFinished)
        ));
    }

    #[test]
    fn test_pendulum_rejects_wrong_action_size() {
        let mut env = Pendulum::default();
        env.reset(Some(1)).unwrap();
        let result = env.step(vec![0.0, 1.0]);
        assert!(matches!(
            result,
            Err(EnvironmentError::InvalidAction {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_pendulum_reset_is_seeded() {
        let mut a = Pendulum::default();
        let mut b = Pendulum::default();
        assert_eq!(a.reset(Some(3)).unwrap(), b.reset(Some(3)).unwrap());
    }

    #[test]
    fn test_angle_normalize() {
        use std::f32::consts::PI;
        assert!((angle_normalize(2.0 * PI + 0.5) - 0.5).abs() < 1e-5);
        assert!((angle_normalize(-0.5) + 0.5).abs() < 1e-5);
    }
}
