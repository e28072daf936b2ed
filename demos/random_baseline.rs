use fruit_hop::{
    agent::PolicyMode,
    algo::RandomPolicy,
    driver::{self, Headless, FixedClock},
    gym::{Arena, ArenaConfig},
};

fn main() -> fruit_hop::Result<()> {
    env_logger::init();

    let mut policy = RandomPolicy::new(43298742);
    let score = driver::average_score(&mut policy, &ArenaConfig::default(), 300, 30, 60)?;
    println!("Average score over 300 runs: {score}");

    // one minute of play at 60 fps, as an interactive run would see it
    let mut arena = Arena::new(ArenaConfig::default())?;
    driver::run_interactive(
        &mut arena,
        &mut policy,
        PolicyMode::Inference,
        &mut Headless::for_frames(3600),
        &mut FixedClock(1.0 / 60.0),
    )?;
    println!("{}", arena.hud_text());
    Ok(())
}
