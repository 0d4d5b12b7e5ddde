#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-driven orchestrator that wires the world to every pure system.
//!
//! A [`Simulation`] owns the authoritative world plus one instance of each
//! system. Every call to [`Simulation::step`] clamps and scales the frame
//! delta, then runs movement, spawning, targeting, combat, collision
//! resolution, cooperation, sweeping, and wave completion in that order. All
//! randomness is derived from a single seed so identical inputs replay
//! identically.

use std::time::Duration;

use skyline_defence_core::{
    CityId, Command, DestructionCause, Event, FrameSnapshot, GimmickCatalog, ProgressionSnapshot,
    Settings, TowerId, TowerTarget, Vec2,
};
use skyline_defence_system_collision::{point_in_circle, point_in_rect};
use skyline_defence_system_cooperation::{Cooperation, CooperationContext};
use skyline_defence_system_spawning::{Config as SpawnConfig, SpawnContext, Spawning};
use skyline_defence_system_tower_combat::{can_fire_at, TowerCombat};
use skyline_defence_system_tower_targeting::{
    Config as TargetingConfig, TargetingContext, TowerTargeting,
};
use skyline_defence_world::{self as world, query, World};

mod seeds;

/// Longest frame the simulation integrates in one step.
pub const MAX_FRAME: Duration = Duration::from_millis(33);

const TOWER_PICK_RADIUS: f32 = 15.0;

/// Running totals gathered from world events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames stepped so far.
    pub frames: u64,
    /// Enemies killed by towers, railguns, or the super-weapon.
    pub enemies_destroyed: u64,
    /// Enemies that struck the ground.
    pub ground_impacts: u64,
    /// Shared trucks dispatched.
    pub trucks_deployed: u64,
    /// Requests for help that were turned down.
    pub refusals: u64,
    /// Super-weapon discharges.
    pub super_weapons_fired: u32,
    /// Waves cleared.
    pub waves_completed: u32,
}

impl RunStats {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemyDestroyed { cause, .. } => match cause {
                    DestructionCause::Intercepted
                    | DestructionCause::Railgun
                    | DestructionCause::SuperWeapon => self.enemies_destroyed += 1,
                    DestructionCause::GroundImpact => self.ground_impacts += 1,
                    DestructionCause::OutOfBounds | DestructionCause::Cleared => {}
                },
                Event::TruckDeployed { .. } => self.trucks_deployed += 1,
                Event::AssistanceRefused { .. } => self.refusals += 1,
                Event::SuperWeaponFired { .. } => self.super_weapons_fired += 1,
                Event::WaveCompleted { .. } => self.waves_completed += 1,
                _ => {}
            }
        }
    }
}

/// Deterministic headless simulation of one defence session.
#[derive(Debug)]
pub struct Simulation {
    seed: u64,
    catalog: GimmickCatalog,
    settings: Settings,
    world: World,
    spawning: Spawning,
    targeting: TowerTargeting,
    combat: TowerCombat,
    cooperation: Cooperation,
    events: Vec<Event>,
    targets: Vec<TowerTarget>,
    stats: RunStats,
}

impl Simulation {
    /// Creates a session from a seed, an archetype catalog, and settings.
    #[must_use]
    pub fn new(seed: u64, catalog: GimmickCatalog, settings: Settings) -> Self {
        let settings = settings.sanitized();
        if catalog.is_empty() {
            log::warn!("archetype catalog is empty; waves will spawn nothing");
        }
        let mut simulation = Self {
            seed,
            catalog,
            settings,
            world: World::with_seed(seeds::labeled(seed, "world")),
            spawning: Spawning::new(SpawnConfig::new(seeds::labeled(seed, "spawning"))),
            targeting: TowerTargeting::new(TargetingConfig::new(seeds::labeled(
                seed,
                "targeting",
            ))),
            combat: TowerCombat::new(),
            cooperation: Cooperation::new(),
            events: Vec::new(),
            targets: Vec::new(),
            stats: RunStats::default(),
        };
        simulation.apply(Command::ConfigureCities {
            count: settings.city_count,
        });
        simulation
    }

    /// Advances the session by one frame and returns the events it produced.
    ///
    /// The frame delta is clamped to [`MAX_FRAME`] and scaled by the game
    /// speed. Once every city has fallen the session stops advancing.
    pub fn step(&mut self, frame_dt: Duration) -> &[Event] {
        self.events.clear();
        if query::is_game_over(&self.world) {
            return &self.events;
        }
        let dt = scaled_delta(frame_dt, self.settings.game_speed);
        self.stats.frames += 1;

        self.apply(Command::Tick { dt });

        let mut commands = Vec::new();
        self.spawning.handle(
            &self.events,
            spawn_context(&self.world, &self.settings, &self.catalog),
            &mut commands,
        );
        self.submit(&mut commands);

        let cities = query::city_view(&self.world);
        let towers = query::tower_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.targeting.handle(
            TargetingContext {
                now: query::clock(&self.world),
                progression: query::progression(&self.world),
                settings: &self.settings,
                field: query::field(&self.world),
                cities: &cities,
                towers: &towers,
                enemies: &enemies,
            },
            &mut self.targets,
        );
        self.combat
            .handle(&cities, &towers, &self.targets, &mut commands);
        self.submit(&mut commands);

        self.apply(Command::ResolveCollisions {
            dt,
            settings: self.settings,
        });

        let cities = query::city_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        let trucks = query::truck_view(&self.world);
        self.cooperation.handle(
            CooperationContext {
                now: query::clock(&self.world),
                progression: query::progression(&self.world),
                settings: &self.settings,
                field: query::field(&self.world),
                cities: &cities,
                enemies: &enemies,
                trucks: &trucks,
            },
            &mut commands,
        );
        self.submit(&mut commands);

        self.apply(Command::Sweep);

        self.spawning
            .check_completion(query::active_enemy_count(&self.world), &mut commands);
        self.submit(&mut commands);

        &self.events
    }

    /// Fires the nearest ready tower that can legally shoot at `point`.
    ///
    /// Returns the tower that fired, or `None` when no tower qualifies.
    pub fn manual_shot(&mut self, point: Vec2) -> Option<TowerId> {
        if !point.is_finite() {
            return None;
        }
        let cities = query::city_view(&self.world);
        let towers = query::tower_view(&self.world);
        let shooter = towers
            .iter()
            .filter(|tower| tower.online && tower.ready && can_fire_at(tower, point, &cities))
            .fold(None, |best: Option<(f32, TowerId)>, tower| {
                let gap = tower.position.distance(point);
                match best {
                    Some((current, _)) if current <= gap => best,
                    _ => Some((gap, tower.id)),
                }
            })
            .map(|(_, id)| id)?;
        self.apply(Command::FireProjectile {
            tower: shooter,
            aim: point,
        });
        Some(shooter)
    }

    /// Injects one boss-tier enemy from the current era.
    pub fn spawn_boss(&mut self) {
        let mut commands = Vec::new();
        self.spawning.spawn_boss(
            spawn_context(&self.world, &self.settings, &self.catalog),
            &mut commands,
        );
        self.submit(&mut commands);
    }

    /// Releases a burst of enemies outside the wave budget.
    pub fn death_wave(&mut self) {
        let mut commands = Vec::new();
        self.spawning.death_wave(
            spawn_context(&self.world, &self.settings, &self.catalog),
            &mut commands,
        );
        self.submit(&mut commands);
    }

    /// Clears the field and completes the current wave.
    pub fn skip_wave(&mut self) {
        self.apply(Command::ClearEnemies);
        self.apply(Command::CompleteWave);
    }

    /// Clears the field and jumps to the first wave of the next era.
    pub fn skip_era(&mut self) {
        self.apply(Command::ClearEnemies);
        self.apply(Command::AdvanceEra);
    }

    /// Destroys the city or tower under `point`. Cities take precedence.
    ///
    /// Returns whether anything was hit.
    pub fn destroy_at(&mut self, point: Vec2) -> bool {
        let city: Option<CityId> = query::city_footprints(&self.world)
            .into_iter()
            .find(|(_, footprint)| point_in_rect(point, *footprint))
            .map(|(id, _)| id);
        if let Some(city) = city {
            self.apply(Command::DestroyCity { city });
            return true;
        }

        let tower = query::tower_view(&self.world)
            .iter()
            .find(|tower| point_in_circle(point, tower.position, TOWER_PICK_RADIUS))
            .map(|tower| tower.id);
        match tower {
            Some(tower) => {
                self.apply(Command::DestroyTower { tower });
                true
            }
            None => false,
        }
    }

    /// Starts a fresh session with the same seed, catalog, and settings.
    pub fn restart(&mut self) {
        let catalog = std::mem::take(&mut self.catalog);
        *self = Self::new(self.seed, catalog, self.settings);
    }

    /// Sets the difficulty in `0.0..=1.0`.
    pub fn set_difficulty(&mut self, difficulty: f32) {
        self.update_settings(Settings {
            difficulty,
            ..self.settings
        });
    }

    /// Sets the multiplier applied to every frame delta.
    pub fn set_game_speed(&mut self, game_speed: f32) {
        self.update_settings(Settings {
            game_speed,
            ..self.settings
        });
    }

    /// Sets the AI aim accuracy in `0.0..=1.0`.
    pub fn set_ai_accuracy(&mut self, ai_accuracy: f32) {
        self.update_settings(Settings {
            ai_accuracy,
            ..self.settings
        });
    }

    /// Sets the repair-rate multiplier.
    pub fn set_repair_rate_multiplier(&mut self, repair_rate_multiplier: f32) {
        self.update_settings(Settings {
            repair_rate_multiplier,
            ..self.settings
        });
    }

    /// Forces a coordination level, or restores the progression-driven one.
    pub fn set_coordination_override(&mut self, coordination_override: Option<f32>) {
        self.update_settings(Settings {
            coordination_override,
            ..self.settings
        });
    }

    /// Changes the number of cities and regenerates the topology.
    pub fn set_city_count(&mut self, city_count: u32) {
        let previous = self.settings.city_count;
        self.update_settings(Settings {
            city_count,
            ..self.settings
        });
        if self.settings.city_count != previous {
            self.apply(Command::ConfigureCities {
                count: self.settings.city_count,
            });
        }
    }

    /// Settings currently in force.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Current wave, level, era, and super-weapon state.
    #[must_use]
    pub fn progression(&self) -> ProgressionSnapshot {
        query::progression(&self.world)
    }

    /// Reports whether every city has fallen.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        query::is_game_over(&self.world)
    }

    /// Totals gathered since the session started.
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Latest threat assessed for `city`.
    #[must_use]
    pub fn threat(&self, city: CityId) -> Option<f32> {
        self.cooperation.threat(city)
    }

    /// Read-only access to the authoritative world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Everything a renderer needs to draw the current frame.
    #[must_use]
    pub fn frame_snapshot(&self) -> FrameSnapshot {
        query::frame_snapshot(&self.world)
    }

    fn update_settings(&mut self, settings: Settings) {
        self.settings = settings.sanitized();
        log::debug!("settings updated: {:?}", self.settings);
    }

    fn submit(&mut self, commands: &mut Vec<Command>) {
        for command in commands.drain(..) {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        let start = self.events.len();
        world::apply(&mut self.world, command, &mut self.events);
        self.stats.record(&self.events[start..]);
    }
}

fn spawn_context<'a>(
    world: &World,
    settings: &'a Settings,
    catalog: &'a GimmickCatalog,
) -> SpawnContext<'a> {
    SpawnContext {
        progression: query::progression(world),
        settings,
        catalog,
        field: query::field(world),
    }
}

fn scaled_delta(frame_dt: Duration, game_speed: f32) -> Duration {
    let speed = if game_speed.is_finite() && game_speed > 0.0 {
        game_speed
    } else {
        1.0
    };
    let nanos = frame_dt.min(MAX_FRAME).as_nanos() as f64 * f64::from(speed);
    Duration::from_nanos(nanos.round() as u64)
}
