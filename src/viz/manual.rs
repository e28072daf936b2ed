use std::time::Instant;

use crate::{
    action::Action,
    agent::{Policy, PolicyMode},
    error::Result,
    gym::{Arena, Observation},
};

use super::input::Keyboard;

/// A human at the keyboard: up jumps, left and right thrust
///
/// Reads the keys an [`ArenaView`](super::ArenaView) built with the same [`Keyboard`]
/// has seen. Never learns.
#[derive(Debug, Clone, Default)]
pub struct ManualPolicy {
    keyboard: Keyboard,
}

impl ManualPolicy {
    pub fn new(keyboard: Keyboard) -> Self {
        Self { keyboard }
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }
}

impl Policy<Arena> for ManualPolicy {
    fn act(&mut self, _observation: &Observation, _mode: PolicyMode) -> Result<Action> {
        Ok(self.keyboard.action(Instant::now()))
    }

    fn feedback(&mut self, _reward: f32, _episode_ended: bool, _mode: PolicyMode) {}
}
