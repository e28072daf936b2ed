use std::{collections::BTreeMap, ops::Index};

use strum::{Display, EnumIter, IntoStaticStr, VariantArray};

/// Represents a continuous-time environment advanced in discrete steps of `dt` seconds,
/// defining the dynamics an agent operates in.
///
/// The environment does not decide when an episode ends; the caller drives it for a
/// fixed number of steps or until it is told to stop.
pub trait Environment {
    /// A snapshot of the environment passed to a policy
    type State;

    /// A representation of an action that a policy can take to affect the environment
    type Action;

    /// What happened during one step, used to derive the reward
    type Events;

    /// Take a snapshot of the current state
    fn observe(&self) -> Self::State;

    /// Advance the environment by `dt` seconds while `action` is held
    fn step(&mut self, action: Self::Action, dt: f32) -> Self::Events;

    /// Scalar reward for the events of one step
    fn reward(&self, events: &Self::Events) -> f32;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// Metrics an environment accumulates for reporting
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    IntoStaticStr,
    VariantArray,
)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    Reward,
    Score,
    Deaths,
}

/// Per-episode metric accumulator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    entries: BTreeMap<Metric, f64>,
}

impl Report {
    pub fn new(keys: &[Metric]) -> Self {
        Self {
            entries: keys.iter().map(|&k| (k, 0.0)).collect(),
        }
    }

    /// Mutable access to a tracked metric, inserting it at zero if missing
    pub fn entry(&mut self, key: Metric) -> &mut f64 {
        self.entries.entry(key).or_insert(0.0)
    }

    pub fn get(&self, key: Metric) -> Option<f64> {
        self.entries.get(&key).copied()
    }

    pub fn keys(&self) -> Vec<Metric> {
        self.entries.keys().copied().collect()
    }

    /// Return the accumulated values and reset every metric to zero
    pub fn take(&mut self) -> BTreeMap<Metric, f64> {
        let taken = self.entries.clone();
        self.entries.values_mut().for_each(|v| *v = 0.0);
        taken
    }
}

impl Index<Metric> for Report {
    type Output = f64;

    fn index(&self, key: Metric) -> &Self::Output {
        &self.entries[&key]
    }
}
