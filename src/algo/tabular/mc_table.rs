use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

use crate::{
    action::{Action, ACTION_COUNT},
    agent::{Policy, PolicyMode},
    discretize::{Discretizer, Grid},
    ensure_interval,
    error::{ensure, Error, Result},
    exploration::{Choice, EpsilonGreedy},
    gym::{Arena, Observation},
};

/// Configuration for the [`McTableAgent`]
#[derive(Debug, Clone, PartialEq)]
pub struct McTableAgentConfig {
    /// Probability of acting greedily, see [`EpsilonGreedy`]
    ///
    /// **Default**: `0.9`
    pub epsilon: f32,
    /// Learning rate
    ///
    /// **Default**: `0.05`
    pub alpha: f32,
    /// Discount factor
    ///
    /// **Default**: `0.9`
    pub gamma: f32,
    /// Observation bucketing
    pub grid: Grid,
    /// Values start uniformly in `[0, init_noise)` so ties break pseudo-randomly
    ///
    /// **Default**: `1e-18`
    pub init_noise: f32,
    /// Transitions one learning episode may hold before the agent gives up
    ///
    /// **Default**: `100_000`
    pub max_episode_len: usize,
    /// Seed of the agent's random generator
    pub seed: u64,
}

impl Default for McTableAgentConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.9,
            alpha: 0.05,
            gamma: 0.9,
            grid: Grid::default(),
            init_noise: 1e-18,
            max_episode_len: 100_000,
            seed: 43298742,
        }
    }
}

/// One recorded step of a learning episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    /// Action bitmask
    pub action: usize,
    pub reward: f32,
}

/// Tabular Monte Carlo agent over a discretized [`Arena`]
///
/// Values live in one flat table addressed by [`Discretizer::state_index`] plus the
/// action bitmask. During a learning episode every step is recorded; when the episode
/// ends, returns are computed backwards and each state-action pair visited in the
/// episode is blended into the table exactly once:
/// `V ← (1 - α)V + αG`.
///
/// When a pair repeats within an episode, the return written last by the backward
/// pass, i.e. that of its earliest visit, is the one blended in. A return of exactly
/// zero leaves its slot untouched.
#[derive(Debug, Clone)]
pub struct McTableAgent {
    discretizer: Discretizer,
    values: Vec<f32>,
    returns: Vec<f32>,
    episode: Vec<Transition>,
    exploration: EpsilonGreedy,
    alpha: f32,
    gamma: f32,
    max_episode_len: usize,
    rng: StdRng,
    episodes_learned: u64,
}

impl McTableAgent {
    /// **Errors** if `alpha`, `gamma` or `epsilon` is not in `[0,1]`, the grid is
    /// invalid, or the episode ceiling is zero
    pub fn new(config: McTableAgentConfig) -> Result<Self> {
        let McTableAgentConfig {
            epsilon,
            alpha,
            gamma,
            grid,
            init_noise,
            max_episode_len,
            seed,
        } = config;
        ensure_interval!(alpha, 0.0, 1.0)?;
        ensure_interval!(gamma, 0.0, 1.0)?;
        ensure(init_noise.is_finite() && init_noise >= 0.0, || {
            format!("Initial noise must be finite and non-negative, got {init_noise}")
        })?;
        ensure(max_episode_len > 0, || String::from("Episode ceiling must be positive"))?;
        let exploration = EpsilonGreedy::new(epsilon)?;
        let discretizer = Discretizer::new(grid, ACTION_COUNT)?;

        let size = discretizer.table_size();
        let mut rng = StdRng::seed_from_u64(seed);
        let values = if init_noise > 0.0 {
            Uniform::new(0.0, init_noise)
                .sample_iter(&mut rng)
                .take(size)
                .collect()
        } else {
            vec![0.0; size]
        };

        Ok(Self {
            discretizer,
            values,
            returns: vec![0.0; size],
            episode: Vec::new(),
            exploration,
            alpha,
            gamma,
            max_episode_len,
            rng,
            episodes_learned: 0,
        })
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    /// Set the probability of acting greedily; the agent never changes it itself
    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.exploration.set_epsilon(epsilon);
    }

    pub fn discretizer(&self) -> &Discretizer {
        &self.discretizer
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Stored value of `action` in the state containing `observation`
    pub fn value(&self, observation: &Observation, action: Action) -> f32 {
        self.values[self.discretizer.state_index(observation) + action.mask()]
    }

    /// Transitions recorded in the current learning episode
    pub fn episode(&self) -> &[Transition] {
        &self.episode
    }

    /// Number of learning passes performed
    pub fn episodes_learned(&self) -> u64 {
        self.episodes_learned
    }

    /// Pick an action bitmask for `observation` with the epsilon greedy policy
    ///
    /// Exploiting takes the highest valued action, the lowest mask on ties.
    pub fn select_action(&mut self, observation: &Observation) -> usize {
        match self.exploration.choose(&mut self.rng) {
            Choice::Explore => self.rng.gen_range(0..ACTION_COUNT),
            Choice::Exploit => {
                let base = self.discretizer.state_index(observation);
                greedy(&self.values[base..base + ACTION_COUNT])
            }
        }
    }

    /// Backward pass computing discounted returns, forward pass blending them in
    fn learn(&mut self) {
        let mut g = 0.0;
        for t in self.episode.iter().rev() {
            g = t.reward + self.gamma * g;
            let address = self.discretizer.state_index(&t.observation) + t.action;
            self.returns[address] = g;
        }

        let mut updated = 0;
        for t in &self.episode {
            let address = self.discretizer.state_index(&t.observation) + t.action;
            let g = std::mem::take(&mut self.returns[address]);
            if g != 0.0 {
                let v = &mut self.values[address];
                *v = (1.0 - self.alpha) * *v + self.alpha * g;
                updated += 1;
            }
        }

        self.episodes_learned += 1;
        debug!(
            "episode {} learned: {} transitions, {} values updated",
            self.episodes_learned,
            self.episode.len(),
            updated
        );
        self.episode.clear();
    }

    /// Hook for end-of-episode telemetry outside of learning
    fn report(&self) {
        trace!("inference episode finished");
    }

    /// Write the value table as a little-endian length followed by `f32` values
    pub fn save_values<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&(self.values.len() as u64).to_le_bytes())?;
        for v in &self.values {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Replace the value table with one written by [`save_values`](Self::save_values)
    ///
    /// **Errors** if the stored table has a different size; the current table is kept
    pub fn load_values<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let mut len = [0; 8];
        reader.read_exact(&mut len)?;
        let found = u64::from_le_bytes(len) as usize;
        let expected = self.values.len();
        if found != expected {
            return Err(Error::CheckpointSize { expected, found });
        }

        let mut values = Vec::with_capacity(expected);
        let mut buf = [0; 4];
        for _ in 0..expected {
            reader.read_exact(&mut buf)?;
            values.push(f32::from_le_bytes(buf));
        }
        self.values = values;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_values(BufWriter::new(File::create(path)?))
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.load_values(BufReader::new(File::open(path)?))
    }
}

/// Index of the first maximal value
fn greedy(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

impl Policy<Arena> for McTableAgent {
    fn act(&mut self, observation: &Observation, mode: PolicyMode) -> Result<Action> {
        let action = self.select_action(observation);
        if mode == PolicyMode::Learning {
            self.episode.push(Transition {
                observation: *observation,
                action,
                reward: 0.0,
            });
            if self.episode.len() > self.max_episode_len {
                return Err(Error::RunawayEpisode {
                    limit: self.max_episode_len,
                });
            }
        }
        Ok(Action::from_mask(action))
    }

    fn feedback(&mut self, reward: f32, episode_ended: bool, mode: PolicyMode) {
        match mode {
            PolicyMode::Learning => {
                if let Some(last) = self.episode.last_mut() {
                    last.reward = reward;
                }
                if episode_ended {
                    self.learn();
                }
            }
            PolicyMode::Inference => {
                if episode_ended {
                    self.report();
                }
            }
        }
    }
}
