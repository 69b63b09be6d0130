//! Tick Platformer demo entry point
//!
//! Runs the demo scene with a seeded bot for a fixed number of ticks and
//! prints the final state digest. Two runs with the same arguments print the
//! same digest.

use std::path::PathBuf;

use clap::Parser;
use tick_platformer::{Simulation, Tuning, bot::Bot, consts::SIM_DT, scene, sim::Ground};

/// Run the demo scene headless and print a state digest
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Seed for the input bot
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// JSON tuning file (defaults are used for missing fields)
    #[arg(long)]
    tuning: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    log::info!("Tick Platformer starting: {args:?}");

    let tuning = match &args.tuning {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };

    let (world, player) = scene::demo_scene();
    let mut sim = Simulation::with_world(world, tuning);
    let mut bot = Bot::new(args.seed);

    let mut landings = 0u32;
    let mut jumps = 0u32;
    let mut last_jump = sim.world().player(player)?.jump.last_jump;

    for _ in 0..args.ticks {
        bot.drive(sim.world_mut(), player)?;
        sim.step(SIM_DT)?;

        let state = sim.world().player(player)?;
        if matches!(state.ground, Ground::Grounded(g) if g.landed == sim.tick()) {
            landings += 1;
        }
        if state.jump.last_jump != last_jump {
            jumps += 1;
            last_jump = state.jump.last_jump;
        }
    }

    let body = &sim.world().get(player)?.body;
    log::info!(
        "Finished {} ticks: {landings} landings, {jumps} jumps",
        sim.tick()
    );
    println!("tick:     {}", sim.tick());
    println!("player:   ({:.3}, {:.3})", body.pos.x, body.pos.y);
    println!("velocity: ({:.3}, {:.3})", body.dynamics.vel.x, body.dynamics.vel.y);
    println!("digest:   {:016x}", sim.world().digest());
    Ok(())
}
