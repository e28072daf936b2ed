use std::{
    collections::BTreeMap,
    io::Write,
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    agent::{Policy, PolicyMode},
    algo::McTableAgent,
    decay::{Decay, Linear},
    env::{Environment, Metric},
    error::{ensure, Error, Result},
    gym::{Arena, ArenaConfig},
    util::ensure_dt,
};

/// Number of whole steps of `dt` that fit in `duration`
///
/// Rounds down, but a quotient within `1e-4` below an integer counts as that integer
/// so that e.g. 10 s at `dt = 0.05` is 200 steps despite `0.05` not being exact.
pub fn steps_for(duration: f32, dt: f32) -> usize {
    let q = duration as f64 / dt as f64;
    (q + 1e-4).floor().max(0.0) as usize
}

/// Drive `policy` in `env` for exactly `steps` steps of `dt` seconds
///
/// Every step the policy acts on the current observation, the environment advances,
/// and the reward goes back to the policy with `episode_ended` set on the last step.
///
/// **Returns** the total reward
pub fn run_steps<E, P>(
    env: &mut E,
    policy: &mut P,
    steps: usize,
    dt: f32,
    mode: PolicyMode,
) -> Result<f32>
where
    E: Environment,
    P: Policy<E> + ?Sized,
{
    ensure_dt(dt)?;
    let mut total = 0.0;
    for i in 1..=steps {
        let state = env.observe();
        let action = policy.act(&state, mode)?;
        let events = env.step(action, dt);
        let reward = env.reward(&events);
        total += reward;
        policy.feedback(reward, i == steps, mode);
    }
    Ok(total)
}

/// Run one headless episode lasting `duration` simulated seconds
pub fn run_episode<E, P>(
    env: &mut E,
    policy: &mut P,
    duration: f32,
    dt: f32,
    mode: PolicyMode,
) -> Result<f32>
where
    E: Environment,
    P: Policy<E> + ?Sized,
{
    ensure_dt(dt)?;
    ensure(duration.is_finite() && duration >= 0.0, || {
        format!("Episode duration must be finite and non-negative, got {duration}")
    })?;
    run_steps(env, policy, steps_for(duration, dt), dt, mode)
}

/// Run one headless episode of `seconds * fps` steps at `dt = 1 / fps`
pub fn simulated_run<E, P>(
    env: &mut E,
    policy: &mut P,
    seconds: u32,
    fps: u32,
    mode: PolicyMode,
) -> Result<f32>
where
    E: Environment,
    P: Policy<E> + ?Sized,
{
    ensure(fps > 0, || String::from("Frame rate must be positive"))?;
    let steps = seconds.checked_mul(fps).ok_or_else(|| {
        Error::InvalidConfig(format!("{seconds}s at {fps} fps is too many steps"))
    })?;
    run_steps(env, policy, steps as usize, 1.0 / fps as f32, mode)
}

/// Display side of an interactive run
pub trait Renderer {
    /// Whether the user asked to stop
    fn poll_close_requested(&mut self) -> bool;

    /// Show the player and the fruit
    fn draw(&mut self, player: (f32, f32), fruit: (f32, f32));

    /// Show a line of status text
    fn display_text(&mut self, text: &str);
}

/// Renderer that shows nothing and never asks to stop on its own
///
/// With `frames` set, asks to stop before the last of that many frames so the run
/// takes exactly `frames` steps (at least one).
#[derive(Debug, Clone, Default)]
pub struct Headless {
    pub frames: Option<u64>,
    drawn: u64,
}

impl Headless {
    pub fn for_frames(frames: u64) -> Self {
        Self {
            frames: Some(frames),
            drawn: 0,
        }
    }
}

impl Renderer for Headless {
    fn poll_close_requested(&mut self) -> bool {
        self.frames.is_some_and(|f| self.drawn + 1 >= f)
    }

    fn draw(&mut self, _player: (f32, f32), _fruit: (f32, f32)) {
        self.drawn += 1;
    }

    fn display_text(&mut self, _text: &str) {}
}

/// Source of the time step for each frame of an interactive run
pub trait FrameClock {
    /// Seconds to simulate for the next frame
    fn tick(&mut self) -> f32;
}

/// Always the same time step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub f32);

impl FrameClock for FixedClock {
    fn tick(&mut self) -> f32 {
        self.0
    }
}

/// Paces frames to a target rate and reports the real elapsed time
#[derive(Debug, Clone)]
pub struct WallClock {
    period: Duration,
    last: Instant,
}

impl WallClock {
    pub fn new(fps: u32) -> Result<Self> {
        ensure(fps > 0, || String::from("Frame rate must be positive"))?;
        Ok(Self {
            period: Duration::from_secs_f64(1.0 / fps as f64),
            last: Instant::now(),
        })
    }
}

impl FrameClock for WallClock {
    fn tick(&mut self) -> f32 {
        let elapsed = self.last.elapsed();
        if elapsed < self.period {
            thread::sleep(self.period - elapsed);
        }
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.max(f32::EPSILON)
    }
}

/// Run `policy` in `arena` until `renderer` asks to close
///
/// The close request is polled before each step. The step taken after it is seen is
/// the last one and gets terminal feedback. If the loop fails part way, the steps
/// already taken never receive a terminal one.
///
/// **Returns** the total reward
pub fn run_interactive<P, R, C>(
    arena: &mut Arena,
    policy: &mut P,
    mode: PolicyMode,
    renderer: &mut R,
    clock: &mut C,
) -> Result<f32>
where
    P: Policy<Arena> + ?Sized,
    R: Renderer + ?Sized,
    C: FrameClock + ?Sized,
{
    let mut total = 0.0;
    let mut frames = 0u64;
    loop {
        let closing = renderer.poll_close_requested();
        let reward = match interactive_step(arena, policy, mode, clock) {
            Ok(reward) => reward,
            Err(e) => {
                if frames > 0 && mode == PolicyMode::Learning {
                    warn!("interactive run aborted after {frames} frames without a terminal step");
                }
                return Err(e);
            }
        };
        total += reward;
        policy.feedback(reward, closing, mode);

        let k = arena.kinematics();
        renderer.draw((k.px, k.py), (k.fx, k.fy));
        renderer.display_text(&arena.hud_text());
        frames += 1;
        if closing {
            break;
        }
    }
    Ok(total)
}

fn interactive_step<P, C>(arena: &mut Arena, policy: &mut P, mode: PolicyMode, clock: &mut C) -> Result<f32>
where
    P: Policy<Arena> + ?Sized,
    C: FrameClock + ?Sized,
{
    let dt = clock.tick();
    ensure_dt(dt)?;
    let action = policy.act(&arena.observe(), mode)?;
    let events = arena.step(action, dt);
    Ok(arena.reward(&events))
}

/// Length and pacing of a training schedule
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Number of learning episodes
    ///
    /// **Default**: `100_000`
    pub episodes: u32,
    /// Simulated length of one episode
    ///
    /// **Default**: `10`
    pub seconds: u32,
    /// Steps per simulated second
    ///
    /// **Default**: `20`
    pub fps: u32,
    /// Log a progress line every this many episodes, `0` to stay quiet
    ///
    /// **Default**: `1000`
    pub log_every: u32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            episodes: 100_000,
            seconds: 10,
            fps: 20,
            log_every: 1000,
        }
    }
}

/// Metrics of one finished training episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub epsilon: f32,
    pub total_reward: f32,
    pub metrics: BTreeMap<Metric, f64>,
}

/// Trains a [`McTableAgent`] with an epsilon schedule
///
/// Before episode `i` (from zero) the agent's greedy probability is set to
/// `epsilon.evaluate(i)`. The arena is not reset between episodes.
#[derive(Debug, Clone)]
pub struct Trainer<D: Decay> {
    config: TrainerConfig,
    epsilon: D,
}

impl<D: Decay> Trainer<D> {
    pub fn new(config: TrainerConfig, epsilon: D) -> Result<Self> {
        ensure(config.fps > 0, || String::from("Frame rate must be positive"))?;
        Ok(Self { config, epsilon })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the whole schedule, handing each episode's summary to `on_episode`
    pub fn train<F>(&self, arena: &mut Arena, agent: &mut McTableAgent, mut on_episode: F) -> Result<()>
    where
        F: FnMut(&EpisodeSummary) -> Result<()>,
    {
        let TrainerConfig {
            episodes,
            seconds,
            fps,
            log_every,
        } = self.config;
        info!("training for {episodes} episodes of {seconds}s at {fps} fps");

        for episode in 0..episodes {
            agent.set_epsilon(self.epsilon.evaluate(episode as f32));
            let total_reward = simulated_run(arena, agent, seconds, fps, PolicyMode::Learning)?;
            let summary = EpisodeSummary {
                episode,
                epsilon: agent.epsilon(),
                total_reward,
                metrics: arena.report.take(),
            };
            debug!("episode {episode}: reward {total_reward}");
            if log_every > 0 && (episode + 1) % log_every == 0 {
                info!(
                    "episode {}/{}: epsilon {:.4}, reward {}, score {}, deaths {}",
                    episode + 1,
                    episodes,
                    summary.epsilon,
                    total_reward,
                    summary.metrics.get(&Metric::Score).copied().unwrap_or_default(),
                    summary.metrics.get(&Metric::Deaths).copied().unwrap_or_default(),
                );
            }
            on_episode(&summary)?;
        }
        Ok(())
    }
}

impl Trainer<Linear> {
    /// Anneal linearly from the agent's starting epsilon to fully greedy over the schedule
    pub fn linear(config: TrainerConfig, start_epsilon: f32) -> Result<Self> {
        let epsilon = Linear::over(start_epsilon, 1.0, config.episodes.max(1))?;
        Self::new(config, epsilon)
    }
}

/// Writes episode summaries as CSV rows
pub struct SummaryWriter<W: Write> {
    wtr: csv::Writer<W>,
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["episode", "epsilon", "reward", "score", "deaths"])?;
        Ok(Self { wtr })
    }

    pub fn write(&mut self, summary: &EpisodeSummary) -> Result<()> {
        let metric = |m| {
            summary
                .metrics
                .get(&m)
                .copied()
                .unwrap_or_default()
                .to_string()
        };
        self.wtr.write_record([
            summary.episode.to_string(),
            summary.epsilon.to_string(),
            summary.total_reward.to_string(),
            metric(Metric::Score),
            metric(Metric::Deaths),
        ])?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr
            .into_inner()
            .map_err(|e| crate::Error::Io(e.into_error()))
    }
}

/// Average number of fruits `policy` collects over `runs` fresh arenas
///
/// Arena `i` is seeded with `config.seed + i`.
pub fn average_score<P>(
    policy: &mut P,
    config: &ArenaConfig,
    runs: u32,
    seconds: u32,
    fps: u32,
) -> Result<f64>
where
    P: Policy<Arena> + ?Sized,
{
    ensure(runs > 0, || String::from("Need at least one run"))?;
    let mut fruits = 0;
    for i in 0..runs {
        let mut arena = Arena::new(ArenaConfig {
            seed: config.seed.wrapping_add(i as u64),
            ..config.clone()
        })?;
        simulated_run(&mut arena, policy, seconds, fps, PolicyMode::Inference)?;
        fruits += arena.fruits();
    }
    Ok(fruits as f64 / runs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::Action,
        algo::{McTableAgentConfig, RandomPolicy},
        discretize::Grid,
        gym::Observation,
    };

    /// Records the call sequence it sees
    #[derive(Default)]
    struct Recorder {
        acts: usize,
        feedback: Vec<(f32, bool)>,
    }

    impl Policy<Arena> for Recorder {
        fn act(&mut self, _obs: &Observation, _mode: PolicyMode) -> Result<Action> {
            self.acts += 1;
            Ok(Action::IDLE)
        }

        fn feedback(&mut self, reward: f32, episode_ended: bool, _mode: PolicyMode) {
            assert_eq!(self.feedback.len() + 1, self.acts, "one feedback per action");
            self.feedback.push((reward, episode_ended));
        }
    }

    fn arena() -> Arena {
        Arena::new(ArenaConfig::default()).unwrap()
    }

    #[test]
    fn step_counts() {
        assert_eq!(steps_for(10.0, 0.05), 200);
        assert_eq!(steps_for(1.0, 0.3), 3);
        assert_eq!(steps_for(0.0, 0.1), 0);
    }

    #[test]
    fn lock_step_calls() {
        let mut env = arena();
        let mut policy = Recorder::default();
        run_episode(&mut env, &mut policy, 1.0, 0.1, PolicyMode::Learning).unwrap();
        assert_eq!(policy.acts, 10);
        let ended: Vec<_> = policy.feedback.iter().map(|f| f.1).collect();
        assert_eq!(ended.iter().filter(|&&e| e).count(), 1, "one terminal step");
        assert!(ended[9], "last step is terminal");
    }

    #[test]
    fn idle_player_falls_to_death() {
        let mut env = arena();
        let mut policy = Recorder::default();
        // from rest the player needs 0.5s to fall 260 units under gravity 2000
        let total = simulated_run(&mut env, &mut policy, 1, 20, PolicyMode::Inference).unwrap();
        assert!(policy.feedback.iter().any(|&(r, _)| r <= -3000.0));
        assert_eq!(env.deaths(), 2, "died at 0.5s and again at 1s");
        assert_eq!(env.report[Metric::Reward], total as f64);
    }

    #[test]
    fn rejects_bad_dt() {
        let mut env = arena();
        let mut policy = Recorder::default();
        for dt in [0.0, -0.1, f32::NAN] {
            let err = run_episode(&mut env, &mut policy, 1.0, dt, PolicyMode::Inference);
            assert!(matches!(err, Err(Error::InvalidConfig(_))), "dt {dt} rejected");
        }
        assert_eq!(policy.acts, 0, "nothing ran");
    }

    #[test]
    fn rejects_overlong_run() {
        let mut env = arena();
        let mut policy = Recorder::default();
        let err = simulated_run(&mut env, &mut policy, 70_000, 70_000, PolicyMode::Inference);
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
        let err = simulated_run(&mut env, &mut policy, 1, 0, PolicyMode::Inference);
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
        assert_eq!(policy.acts, 0, "nothing ran");
    }

    #[test]
    fn runaway_stops_the_loop() {
        let mut env = arena();
        let mut agent = McTableAgent::new(McTableAgentConfig {
            grid: Grid::for_arena(env.config(), 3, 2),
            max_episode_len: 50,
            ..Default::default()
        })
        .unwrap();
        let err = simulated_run(&mut env, &mut agent, 10, 20, PolicyMode::Learning).unwrap_err();
        assert!(matches!(err, Error::RunawayEpisode { limit: 50 }));
        assert_eq!(agent.episode().len(), 51);
    }

    /// Fixed steps until it runs out, then an invalid one
    struct FailingClock(u32);

    impl FrameClock for FailingClock {
        fn tick(&mut self) -> f32 {
            match self.0.checked_sub(1) {
                Some(left) => {
                    self.0 = left;
                    0.05
                }
                None => 0.0,
            }
        }
    }

    #[test]
    fn interactive_until_close() {
        let mut env = arena();
        let mut policy = Recorder::default();
        let mut renderer = Headless::for_frames(7);
        run_interactive(
            &mut env,
            &mut policy,
            PolicyMode::Learning,
            &mut renderer,
            &mut FixedClock(0.05),
        )
        .unwrap();
        assert_eq!(policy.acts, 7);
        let ended: Vec<_> = policy.feedback.iter().map(|f| f.1).collect();
        assert!(ended[6], "closing step is terminal");
        assert!(ended[..6].iter().all(|&e| !e));
    }

    #[test]
    fn interactive_learns_on_close() {
        let mut env = arena();
        let mut agent = McTableAgent::new(McTableAgentConfig {
            grid: Grid::for_arena(env.config(), 3, 2),
            ..Default::default()
        })
        .unwrap();
        run_interactive(
            &mut env,
            &mut agent,
            PolicyMode::Learning,
            &mut Headless::for_frames(5),
            &mut FixedClock(0.05),
        )
        .unwrap();
        assert!(agent.episode().is_empty());
        assert_eq!(agent.episodes_learned(), 1);
    }

    #[test]
    fn agent_tolerates_aborted_episode() {
        let mut env = arena();
        let mut agent = McTableAgent::new(McTableAgentConfig {
            grid: Grid::for_arena(env.config(), 3, 2),
            ..Default::default()
        })
        .unwrap();
        let err = run_interactive(
            &mut env,
            &mut agent,
            PolicyMode::Learning,
            &mut Headless::default(),
            &mut FailingClock(3),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(agent.episode().len(), 3, "in-flight episode kept");
        simulated_run(&mut env, &mut agent, 1, 20, PolicyMode::Learning).unwrap();
        assert!(agent.episode().is_empty(), "next terminal step learns it");
        assert_eq!(agent.episodes_learned(), 1);
    }

    #[test]
    fn trainer_anneals_epsilon() {
        let mut env = arena();
        let mut agent = McTableAgent::new(McTableAgentConfig {
            grid: Grid::for_arena(env.config(), 3, 2),
            epsilon: 0.5,
            ..Default::default()
        })
        .unwrap();
        let config = TrainerConfig {
            episodes: 4,
            seconds: 1,
            fps: 20,
            log_every: 0,
        };
        let trainer = Trainer::linear(config, agent.epsilon()).unwrap();
        let mut seen = Vec::new();
        trainer
            .train(&mut env, &mut agent, |s| {
                seen.push(s.epsilon);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, [0.5, 0.625, 0.75, 0.875]);
        assert_eq!(agent.episodes_learned(), 4);
    }

    #[test]
    fn summaries_as_csv() {
        let summary = EpisodeSummary {
            episode: 3,
            epsilon: 0.5,
            total_reward: -3000.0,
            metrics: BTreeMap::from([
                (Metric::Reward, -3000.0),
                (Metric::Score, 1.0),
                (Metric::Deaths, 1.0),
            ]),
        };
        let mut wtr = SummaryWriter::new(Vec::new()).unwrap();
        wtr.write(&summary).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(out, "episode,epsilon,reward,score,deaths\n3,0.5,-3000,1,1\n");
    }

    #[test]
    fn baseline_average() {
        let mut policy = RandomPolicy::new(43298742);
        let score = average_score(&mut policy, &ArenaConfig::default(), 3, 5, 60).unwrap();
        assert!(score >= 0.0 && score.is_finite());
        assert!(average_score(&mut policy, &ArenaConfig::default(), 0, 5, 60).is_err());
    }
}
