use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};

use fruit_hop::{
    agent::PolicyMode,
    algo::{McTableAgent, McTableAgentConfig, RandomPolicy},
    decay::{Constant, Decay, Exponential},
    discretize::Grid,
    driver::{self, EpisodeSummary, SummaryWriter, Trainer, TrainerConfig},
    gym::{Arena, ArenaConfig},
};

/// Train and watch a tabular agent catching fruit in a 2D arena
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train an agent, then evaluate it
    Train(TrainArgs),
    /// Average score of the random baseline policy
    Baseline(BaselineArgs),
    /// Evaluate a saved value table, or play yourself with `--manual`
    Play(PlayArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Number of training episodes
    #[arg(long, default_value_t = 100_000)]
    episodes: u32,
    /// Simulated seconds per episode
    #[arg(long, default_value_t = 10)]
    seconds: u32,
    /// Simulation steps per second during training
    #[arg(long, default_value_t = 20)]
    fps: u32,
    /// Initial probability of acting greedily
    #[arg(long, default_value_t = 0.9)]
    epsilon: f32,
    /// How the greedy probability moves toward 1.0 over the schedule
    #[arg(long, value_enum, default_value_t = Schedule::Linear)]
    schedule: Schedule,
    /// Agent seed
    #[arg(long, default_value_t = 43298742)]
    seed: u64,
    /// Arena seed
    #[arg(long, default_value_t = 0)]
    arena_seed: u64,
    /// Log progress every this many episodes
    #[arg(long, default_value_t = 1000)]
    log_every: u32,
    /// Start from a saved value table
    #[arg(long)]
    load: Option<PathBuf>,
    /// Save the value table after training
    #[arg(long)]
    save: Option<PathBuf>,
    /// Write per-episode metrics as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Show the training dashboard
    #[cfg(feature = "viz")]
    #[arg(long)]
    dashboard: bool,
    #[command(flatten)]
    eval: EvalArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum Schedule {
    Linear,
    /// Closes 99% of the gap to 1.0 by the last episode
    Exponential,
    /// Keep the initial value
    Constant,
}

#[derive(Args)]
struct BaselineArgs {
    #[arg(long, default_value_t = 300)]
    runs: u32,
    #[arg(long, default_value_t = 30)]
    seconds: u32,
    #[arg(long, default_value_t = 60)]
    fps: u32,
    #[arg(long, default_value_t = 43298742)]
    seed: u64,
}

#[derive(Args)]
struct PlayArgs {
    /// Saved value table
    #[arg(long)]
    load: Option<PathBuf>,
    /// Steer the player with the arrow keys instead of an agent
    #[cfg(feature = "viz")]
    #[arg(long, conflicts_with = "load")]
    manual: bool,
    #[arg(long, default_value_t = 43298742)]
    seed: u64,
    #[command(flatten)]
    eval: EvalArgs,
}

#[derive(Args)]
struct EvalArgs {
    /// Simulated seconds of the headless evaluation run
    #[arg(long, default_value_t = 60)]
    eval_seconds: u32,
    /// Steps per second during evaluation
    #[arg(long, default_value_t = 60)]
    eval_fps: u32,
    /// Watch the agent in the terminal instead of a headless evaluation
    #[cfg(feature = "viz")]
    #[arg(long)]
    watch: bool,
}

fn init_logging(tui: bool) -> Result<()> {
    #[cfg(feature = "viz")]
    if tui {
        fruit_hop::viz::init_logger(LevelFilter::Debug)?;
        return Ok(());
    }
    let _ = tui;
    env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => train(args),
        Command::Baseline(args) => baseline(args),
        Command::Play(args) => play(args),
    }
}

fn train(args: TrainArgs) -> Result<()> {
    #[cfg(feature = "viz")]
    let dashboard = args.dashboard;
    #[cfg(not(feature = "viz"))]
    let dashboard = false;
    init_logging(dashboard)?;

    let arena_config = ArenaConfig {
        seed: args.arena_seed,
        ..Default::default()
    };
    let mut arena = Arena::new(arena_config.clone())?;
    let mut agent = McTableAgent::new(McTableAgentConfig {
        epsilon: args.epsilon,
        seed: args.seed,
        grid: Grid::for_arena(&arena_config, 10, 6),
        ..Default::default()
    })?;
    info!("value table holds {} entries", agent.values().len());
    if let Some(path) = &args.load {
        agent
            .load(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }

    let config = TrainerConfig {
        episodes: args.episodes,
        seconds: args.seconds,
        fps: args.fps,
        log_every: args.log_every,
    };
    let epsilon = agent.epsilon();
    match args.schedule {
        Schedule::Linear => {
            let trainer = Trainer::linear(config, epsilon)?;
            run_training(&trainer, &mut arena, &mut agent, &args, dashboard)?
        }
        Schedule::Exponential => {
            let rate = 4.6 / args.episodes.max(1) as f32;
            let trainer = Trainer::new(config, Exponential::new(rate, epsilon, 1.0)?)?;
            run_training(&trainer, &mut arena, &mut agent, &args, dashboard)?
        }
        Schedule::Constant => {
            let trainer = Trainer::new(config, Constant::new(epsilon))?;
            run_training(&trainer, &mut arena, &mut agent, &args, dashboard)?
        }
    }

    if let Some(path) = &args.save {
        agent
            .save(path)
            .with_context(|| format!("saving {}", path.display()))?;
        info!("value table saved to {}", path.display());
    }

    evaluate(&mut agent, &arena_config, &args.eval)
}

/// Run the schedule, feeding summaries to the CSV file and the dashboard
fn run_training<D: Decay>(
    trainer: &Trainer<D>,
    arena: &mut Arena,
    agent: &mut McTableAgent,
    args: &TrainArgs,
    dashboard: bool,
) -> Result<()> {
    let mut csv = match &args.csv {
        Some(path) => Some(SummaryWriter::new(File::create(path)?)?),
        None => None,
    };

    #[cfg(feature = "viz")]
    let viz = dashboard.then(|| {
        let keys = arena.report.keys();
        let (handle, tx) = fruit_hop::viz::init(&keys, args.episodes);
        (handle, tx, keys)
    });
    #[cfg(not(feature = "viz"))]
    let _ = dashboard;

    trainer.train(arena, agent, |summary: &EpisodeSummary| {
        if let Some(csv) = csv.as_mut() {
            csv.write(summary)?;
        }
        #[cfg(feature = "viz")]
        if let Some((_, tx, keys)) = &viz {
            let data = keys
                .iter()
                .map(|k| summary.metrics.get(k).copied().unwrap_or_default())
                .collect();
            // the dashboard may already have been closed
            let _ = tx.send(fruit_hop::viz::Update {
                episode: summary.episode,
                data,
            });
        }
        Ok(())
    })?;

    if let Some(csv) = csv {
        csv.into_inner()?;
    }

    #[cfg(feature = "viz")]
    if let Some((handle, tx, _)) = viz {
        drop(tx);
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("dashboard thread panicked"))??;
    }
    Ok(())
}

fn evaluate(agent: &mut McTableAgent, arena_config: &ArenaConfig, eval: &EvalArgs) -> Result<()> {
    agent.set_epsilon(1.0);
    let mut arena = Arena::new(arena_config.clone())?;

    #[cfg(feature = "viz")]
    if eval.watch {
        let mut view = fruit_hop::viz::ArenaView::new(arena_config)?;
        let mut clock = driver::WallClock::new(eval.eval_fps)?;
        driver::run_interactive(&mut arena, agent, PolicyMode::Inference, &mut view, &mut clock)?;
        drop(view);
        println!("{}", arena.hud_text());
        return Ok(());
    }

    let total = driver::simulated_run(
        &mut arena,
        agent,
        eval.eval_seconds,
        eval.eval_fps,
        PolicyMode::Inference,
    )?;
    println!(
        "evaluation: {} fruits, {} deaths, total reward {total}",
        arena.fruits(),
        arena.deaths()
    );
    Ok(())
}

fn baseline(args: BaselineArgs) -> Result<()> {
    init_logging(false)?;
    let mut policy = RandomPolicy::new(args.seed);
    let score = driver::average_score(
        &mut policy,
        &ArenaConfig::default(),
        args.runs,
        args.seconds,
        args.fps,
    )?;
    println!("Average score: {score}");
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    init_logging(false)?;
    let arena_config = ArenaConfig::default();

    #[cfg(feature = "viz")]
    if args.manual {
        return play_manual(&arena_config, args.eval.eval_fps);
    }

    let Some(path) = &args.load else {
        anyhow::bail!("`play` needs a value table to load with --load");
    };
    let mut agent = McTableAgent::new(McTableAgentConfig {
        seed: args.seed,
        grid: Grid::for_arena(&arena_config, 10, 6),
        ..Default::default()
    })?;
    agent
        .load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    evaluate(&mut agent, &arena_config, &args.eval)
}

#[cfg(feature = "viz")]
fn play_manual(arena_config: &ArenaConfig, fps: u32) -> Result<()> {
    use fruit_hop::viz::{ArenaView, Keyboard, ManualPolicy};

    let keyboard = Keyboard::new();
    let mut policy = ManualPolicy::new(keyboard.clone());
    let mut arena = Arena::new(arena_config.clone())?;
    let mut view = ArenaView::with_keyboard(arena_config, keyboard)?;
    let mut clock = driver::WallClock::new(fps)?;
    driver::run_interactive(&mut arena, &mut policy, PolicyMode::Inference, &mut view, &mut clock)?;
    drop(view);
    println!("{}", arena.hud_text());
    Ok(())
}
