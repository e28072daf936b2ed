use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    action::Action,
    agent::{Policy, PolicyMode},
    error::Result,
    gym::{Arena, Observation},
};

/// Baseline that mashes buttons and never learns
///
/// Up is pressed on roughly one step in eleven so the player does not fly into the
/// ceiling; left and right are each pressed half of the time.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy<Arena> for RandomPolicy {
    fn act(&mut self, _observation: &Observation, _mode: PolicyMode) -> Result<Action> {
        Ok(Action {
            up: self.rng.gen_ratio(1, 11),
            left: self.rng.gen_bool(0.5),
            right: self.rng.gen_bool(0.5),
        })
    }

    fn feedback(&mut self, _reward: f32, _episode_ended: bool, _mode: PolicyMode) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_frequencies() {
        let mut policy = RandomPolicy::new(43298742);
        let obs = [0.0; 6];
        let n = 11_000;
        let (mut up, mut left) = (0, 0);
        for _ in 0..n {
            let action = policy.act(&obs, PolicyMode::Inference).unwrap();
            up += action.up as usize;
            left += action.left as usize;
        }
        assert!((700..1300).contains(&up), "up pressed about 1/11 of the time: {up}");
        assert!((5000..6000).contains(&left), "left pressed about half the time: {left}");
    }

    #[test]
    fn seeded() {
        let obs = [0.0; 6];
        let mut a = RandomPolicy::new(1);
        let mut b = RandomPolicy::new(1);
        for _ in 0..100 {
            assert_eq!(
                a.act(&obs, PolicyMode::Inference).unwrap(),
                b.act(&obs, PolicyMode::Inference).unwrap()
            );
        }
    }
}
