use strum::Display;

use crate::{env::Environment, error::Result};

/// Whether a policy should learn from the steps it takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PolicyMode {
    /// Exploit only, record nothing
    #[default]
    Inference,
    /// Explore and record transitions for learning
    Learning,
}

/// Something that picks actions in an [`Environment`] and may learn from rewards
///
/// Every call to [`act`](Policy::act) is followed by exactly one call to
/// [`feedback`](Policy::feedback) carrying the reward of that same step, unless the
/// run is cancelled in between.
pub trait Policy<E: Environment> {
    /// Choose an action for the given state
    ///
    /// **Errors** if the policy cannot continue, e.g. an episode that never ends
    fn act(&mut self, state: &E::State, mode: PolicyMode) -> Result<E::Action>;

    /// Receive the reward for the most recent action
    fn feedback(&mut self, reward: f32, episode_ended: bool, mode: PolicyMode);
}
