use fruit_hop::{
    algo::{McTableAgent, McTableAgentConfig},
    driver::{Trainer, TrainerConfig},
    gym::{Arena, ArenaConfig},
    viz,
};
use log::LevelFilter;

const EPISODES: u32 = 20_000;

fn main() -> anyhow::Result<()> {
    viz::init_logger(LevelFilter::Info)?;

    let mut arena = Arena::new(ArenaConfig::default())?;
    let mut agent = McTableAgent::new(McTableAgentConfig::default())?;
    let trainer = Trainer::linear(
        TrainerConfig {
            episodes: EPISODES,
            log_every: 500,
            ..Default::default()
        },
        agent.epsilon(),
    )?;

    let keys = arena.report.keys();
    let (handle, tx) = viz::init(&keys, EPISODES);

    trainer.train(&mut arena, &mut agent, |summary| {
        let data = keys
            .iter()
            .map(|k| summary.metrics.get(k).copied().unwrap_or_default())
            .collect();
        let _ = tx.send(viz::Update {
            episode: summary.episode,
            data,
        });
        Ok(())
    })?;

    drop(tx);
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("dashboard thread panicked"))??;
    Ok(())
}
