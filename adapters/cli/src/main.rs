#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless runner that plays a Skyline Defence session from the terminal.

mod config;
mod logging;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use skyline_defence_simulation::Simulation;
use skyline_defence_world::query;

use crate::config::Overrides;

const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed driving every random stream of the session.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of 60 Hz frames to run before stopping.
    #[arg(long, default_value_t = 36_000)]
    frames: u64,
    /// Number of cities, overriding the settings file.
    #[arg(long)]
    cities: Option<u32>,
    /// Difficulty in 0..=1, overriding the settings file.
    #[arg(long)]
    difficulty: Option<f32>,
    /// Game speed multiplier, overriding the settings file.
    #[arg(long)]
    speed: Option<f32>,
    /// JSON file of enemy archetypes grouped by era.
    #[arg(long)]
    gimmicks: Option<PathBuf>,
    /// TOML file of session settings.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let settings = config::load_settings(
        args.settings.as_deref(),
        Overrides {
            cities: args.cities,
            difficulty: args.difficulty,
            speed: args.speed,
        },
    )?;
    let catalog = config::load_catalog(args.gimmicks.as_deref())?;

    log::info!(
        "starting session seed={} cities={} difficulty={:.2} speed={:.2}",
        args.seed,
        settings.city_count,
        settings.difficulty,
        settings.game_speed
    );

    let mut simulation = Simulation::new(args.seed, catalog, settings);
    for _ in 0..args.frames {
        if simulation.is_game_over() {
            break;
        }
        let _ = simulation.step(FRAME);
    }

    let progression = simulation.progression();
    let stats = simulation.stats();
    log::info!(
        "session ended after {} frames: wave {} level {} era {:?}, {} cities standing, {} enemies destroyed",
        stats.frames,
        progression.wave,
        progression.level,
        progression.era,
        query::living_city_count(simulation.world()),
        stats.enemies_destroyed
    );
    log::debug!(
        "ground impacts {}, trucks deployed {}, refusals {}, super-weapon shots {}, waves cleared {}",
        stats.ground_impacts,
        stats.trucks_deployed,
        stats.refusals,
        stats.super_weapons_fired,
        stats.waves_completed
    );
    Ok(())
}
