use log::warn;
use rand::Rng;

use crate::{ensure_interval, error::Result};

/// Exploration policy result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Explore,
    Exploit,
}

/// Epsilon greedy exploration policy
///
/// `epsilon` is the probability of exploiting: a uniform draw above it explores,
/// so `1.0` is fully greedy and `0.0` is fully random. The value is owned by the
/// caller's schedule, this policy never changes it on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f32,
}

impl EpsilonGreedy {
    /// **Errors** if `epsilon` is not in the interval `[0,1]`
    pub fn new(epsilon: f32) -> Result<Self> {
        ensure_interval!(epsilon, 0.0, 1.0)?;
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Set the greedy probability, clamped to `[0,1]`
    pub fn set_epsilon(&mut self, epsilon: f32) {
        if epsilon.is_nan() {
            warn!("ignoring NaN epsilon, keeping {}", self.epsilon);
            return;
        }
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Draw one uniform sample from `rng` and decide
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f32>() > self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}
