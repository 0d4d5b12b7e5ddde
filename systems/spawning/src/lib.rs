#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawner that emits enemy spawn commands.
//!
//! Each wave receives a spawn budget derived from its position inside the era
//! and the configured difficulty. Spawns are paced by an accumulator fed from
//! `TimeAdvanced` events, archetypes are drawn by rarity weight, and a growing
//! chance substitutes a boss-tier archetype as the wave progresses.

use std::{sync::Arc, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skyline_defence_core::{
    progression::wave_in_era, Command, Event, Field, Gimmick, GimmickCatalog,
    ProgressionSnapshot, Settings,
};

const BASE_BUDGET: f32 = 10.0;
const BUDGET_PER_WAVE: f32 = 2.0;
const BASE_RATE: f32 = 0.5;
const RATE_PER_WAVE: f32 = 0.1;
const MAX_RATE: f32 = 4.0;
const BOSS_BASE_CHANCE: f32 = 0.05;
const BOSS_RAMP: f32 = 0.10;

/// Number of enemies released by the debug death wave.
pub const DEATH_WAVE_SIZE: u32 = 40;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Inputs the spawner reads each frame.
#[derive(Clone, Copy, Debug)]
pub struct SpawnContext<'a> {
    /// Current progression state.
    pub progression: ProgressionSnapshot,
    /// Settings in force this frame.
    pub settings: &'a Settings,
    /// Archetype tables keyed by era.
    pub catalog: &'a GimmickCatalog,
    /// Playfield dimensions.
    pub field: Field,
}

impl SpawnContext<'_> {
    fn table(&self) -> &[Arc<Gimmick>] {
        self.catalog.era(self.progression.era.config_key())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WavePlan {
    wave: u32,
    budget: u32,
    spawned: u32,
    completion_requested: bool,
}

impl WavePlan {
    fn exhausted(&self) -> bool {
        self.spawned >= self.budget
    }
}

/// Pure system that deterministically emits spawn and wave-completion commands.
#[derive(Debug)]
pub struct Spawning {
    accumulator: Duration,
    rng: ChaCha8Rng,
    plan: Option<WavePlan>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            accumulator: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            plan: None,
        }
    }

    /// Consumes events and the frame context to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], context: SpawnContext<'_>, out: &mut Vec<Command>) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => accumulated = accumulated.saturating_add(*dt),
                Event::WaveStarted { .. } | Event::EraChanged { .. } => self.plan = None,
                _ => {}
            }
        }

        let wave = context.progression.wave;
        let current = self.plan;
        let plan = match current {
            Some(plan) if plan.wave == wave => plan,
            _ => self.start_wave(wave, context),
        };
        self.plan = Some(plan);

        if plan.exhausted() {
            return;
        }
        self.accumulator = self.accumulator.saturating_add(accumulated);

        let interval = spawn_interval(wave);
        let mut plan = plan;
        while self.accumulator >= interval && !plan.exhausted() {
            self.accumulator -= interval;
            let boss_roll: f32 = self.rng.gen();
            let wants_boss = boss_roll < boss_chance(plan.spawned, plan.budget);
            if let Some(command) = self.draw(context, wants_boss) {
                out.push(command);
            }
            plan.spawned += 1;
        }
        self.plan = Some(plan);
    }

    /// Emits `Command::CompleteWave` once the budget is spent and the field
    /// is clear. At most one completion is requested per wave.
    pub fn check_completion(&mut self, active_enemies: usize, out: &mut Vec<Command>) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        if plan.completion_requested || !plan.exhausted() || active_enemies > 0 {
            return;
        }
        plan.completion_requested = true;
        out.push(Command::CompleteWave);
    }

    /// Injects one boss-tier enemy from the current era outside the budget.
    pub fn spawn_boss(&mut self, context: SpawnContext<'_>, out: &mut Vec<Command>) {
        match self.draw(context, true) {
            Some(command) => out.push(command),
            None => log::warn!("era {:?} has no archetypes to spawn", context.progression.era),
        }
    }

    /// Releases a burst of [`DEATH_WAVE_SIZE`] enemies outside the budget.
    pub fn death_wave(&mut self, context: SpawnContext<'_>, out: &mut Vec<Command>) {
        for _ in 0..DEATH_WAVE_SIZE {
            if let Some(command) = self.draw(context, false) {
                out.push(command);
            }
        }
    }

    /// Budget of the wave currently being spawned, if any.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.plan.map(|plan| plan.budget.saturating_sub(plan.spawned))
    }

    fn start_wave(&mut self, wave: u32, context: SpawnContext<'_>) -> WavePlan {
        let budget = wave_budget(wave, context.settings.difficulty);
        self.accumulator = Duration::ZERO;
        if context.table().is_empty() {
            log::warn!(
                "no archetypes configured for {}; wave {wave} spawns nothing",
                context.progression.era.config_key()
            );
            return WavePlan {
                wave,
                budget,
                spawned: budget,
                completion_requested: false,
            };
        }
        log::debug!("wave {wave} budget {budget}");
        WavePlan {
            wave,
            budget,
            spawned: 0,
            completion_requested: false,
        }
    }

    fn draw(&mut self, context: SpawnContext<'_>, wants_boss: bool) -> Option<Command> {
        let table = context.table();
        let bosses: Vec<Arc<Gimmick>> = table
            .iter()
            .filter(|gimmick| gimmick.is_boss_tier())
            .cloned()
            .collect();

        let (gimmick, boss) = if wants_boss && !bosses.is_empty() {
            let index = sample_by_rarity(&bosses, &mut self.rng)?;
            (Arc::clone(&bosses[index]), true)
        } else {
            let index = sample_by_rarity(table, &mut self.rng)?;
            (Arc::clone(&table[index]), false)
        };

        let x = self.rng.gen_range(0.0..=context.field.width.max(0.0));
        Some(Command::SpawnEnemy { gimmick, x, boss })
    }
}

/// Number of enemies released in `wave`, never less than one.
#[must_use]
pub fn wave_budget(wave: u32, difficulty: f32) -> u32 {
    let position = wave_in_era(wave.max(1)) as f32;
    let difficulty = if difficulty.is_finite() {
        difficulty.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let budget = ((BASE_BUDGET + BUDGET_PER_WAVE * (position - 1.0)) * (BASE_RATE + difficulty))
        .round();
    (budget as u32).max(1)
}

/// Delay between consecutive spawns in `wave`.
#[must_use]
pub fn spawn_interval(wave: u32) -> Duration {
    let rate = (BASE_RATE + RATE_PER_WAVE * wave as f32).min(MAX_RATE);
    Duration::from_secs_f32(1.0 / rate)
}

/// Chance that the next spawn is substituted with a boss-tier archetype.
#[must_use]
pub fn boss_chance(spawned: u32, budget: u32) -> f32 {
    if budget == 0 {
        return BOSS_BASE_CHANCE;
    }
    BOSS_BASE_CHANCE + BOSS_RAMP * (spawned as f32 / budget as f32)
}

/// Picks an index with probability proportional to its rarity weight.
///
/// Negative or non-finite weights count as zero. When every weight is zero the
/// pick is uniform. Returns `None` only for an empty slice.
pub fn sample_by_rarity<R: Rng>(entries: &[Arc<Gimmick>], rng: &mut R) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }
    let weight = |gimmick: &Gimmick| {
        if gimmick.rarity.is_finite() {
            gimmick.rarity.max(0.0)
        } else {
            0.0
        }
    };
    let total: f32 = entries.iter().map(|gimmick| weight(gimmick)).sum();
    if total <= 0.0 {
        return Some(rng.gen_range(0..entries.len()));
    }

    let roll = rng.gen::<f32>() * total;
    let mut cumulative = 0.0;
    for (index, gimmick) in entries.iter().enumerate() {
        cumulative += weight(gimmick);
        if roll < cumulative {
            return Some(index);
        }
    }
    entries.iter().rposition(|gimmick| weight(gimmick) > 0.0)
}
