use crate::error::{ensure, Result};

/// An implementation of a value that changes with time (episodes)
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f32) -> f32;
}

fn validate(rate: f32, vi: f32, vf: f32) -> Result<()> {
    ensure(
        rate.is_finite() && ((rate >= 0.0 && vi >= vf) || (rate < 0.0 && vi <= vf)),
        || format!("`vi - vf` must have same sign as `rate` (rate={rate}, vi={vi}, vf={vf})"),
    )
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) * e<sup>-rt</sup>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exponential {
    rate: f32,
    vi: f32,
    vf: f32,
}

impl Exponential {
    pub fn new(rate: f32, vi: f32, vf: f32) -> Result<Self> {
        ensure(rate >= 0.0, || format!("Exponential rate must be non-negative, got {rate}"))?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Exponential {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) * (-rate * t).exp()
    }
}

/// v(t) = v<sub>i</sub> - rt, never passing v<sub>f</sub>
///
/// A negative `rate` makes the value grow toward `vf`, which is how the greedy
/// probability of an [`EpsilonGreedy`](crate::exploration::EpsilonGreedy) policy
/// is annealed toward 1.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Linear {
    rate: f32,
    vi: f32,
    vf: f32,
}

impl Linear {
    pub fn new(rate: f32, vi: f32, vf: f32) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }

    /// Move from `vi` to `vf` in equal increments over `steps` time units
    pub fn over(vi: f32, vf: f32, steps: u32) -> Result<Self> {
        ensure(steps > 0, || String::from("Linear schedule needs at least one step"))?;
        Self::new((vi - vf) / steps as f32, vi, vf)
    }
}

impl Decay for Linear {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf } = self;
        let v = vi - rate * t;
        if rate >= 0.0 {
            v.max(vf)
        } else {
            v.min(vf)
        }
    }
}
