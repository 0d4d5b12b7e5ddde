#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Skyline Defence.

mod cities;
mod enemies;
mod munitions;
mod railguns;
mod towers;
mod trucks;

use std::{sync::Arc, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skyline_defence_core::{
    progression::first_wave_of_era, settings::MAX_CITIES, CityId, Command, DefenderId,
    DestructionCause, EnemyId, Event, ExplosionKind, Field, FireRejection, Gimmick,
    ProgressionSnapshot, RailgunId, Settings, Side, SuperWeaponVote, TowerId, TruckId,
    TruckRejection, Vec2,
};
use skyline_defence_system_collision::{circle_circle, circle_segment, SpatialHash};

use cities::CityState;
use enemies::EnemyState;
use munitions::{Explosion, Projectile, RailgunBolt, BOLT_RADIUS, PROJECTILE_RADIUS};
use railguns::{RailgunState, RAILGUN_DAMAGE, RAILGUN_GROUND_OFFSET, RAILGUN_OFFSET};
use towers::{TowerRegistry, FLAK_TOWER, STANDARD_TOWER, TOWER_GROUND_OFFSET, TOWER_OFFSET};
use trucks::{DefenderProgress, DefenderState, TruckState};

const DEFAULT_SEED: u64 = 0x5eed_c1d7_0000_0001;
const DEFAULT_FIELD: Field = Field::new(800.0, 600.0);
const DEFAULT_CITY_COUNT: u32 = 4;

const CITY_IMPACT_REACH: f32 = 100.0;
const STRUCTURE_IMPACT_REACH: f32 = 60.0;
const IMPACT_SEVERITY: f32 = 0.5;
const IMPACT_BLAST_RADIUS: f32 = 35.0;
const RAILGUN_FLASH_RADIUS: f32 = 15.0;
const SUPER_WEAPON_BLAST_RADIUS: f32 = 50.0;
const SUPER_WEAPON_HEAL: f32 = 30.0;
const SUPER_WEAPON_GOODWILL: f32 = 15.0;
const TOWER_REPAIR_SHARE: f32 = 0.5;
const BOLT_MARGIN: f32 = 100.0;

const REQUESTER_GOODWILL: f32 = 5.0;
const HELPER_GOODWILL: f32 = 10.0;
const REFUSAL_PENALTY: f32 = -10.0;

/// Capability shared by every simulated entity.
///
/// Entities are never removed mid-frame; they flip inactive and disappear in
/// the next [`Command::Sweep`].
trait Body {
    fn position(&self) -> Vec2;
    fn radius(&self) -> f32;
    fn is_active(&self) -> bool;
}

/// Represents the authoritative Skyline Defence world state.
#[derive(Debug)]
pub struct World {
    field: Field,
    clock: Duration,
    cities: Vec<CityState>,
    towers: TowerRegistry,
    trucks: Vec<TruckState>,
    railguns: Vec<RailgunState>,
    defenders: Vec<DefenderState>,
    enemies: Vec<EnemyState>,
    projectiles: Vec<Projectile>,
    bolts: Vec<RailgunBolt>,
    explosions: Vec<Explosion>,
    progression: ProgressionSnapshot,
    grid: SpatialHash,
    rng: ChaCha8Rng,
    next_enemy_id: u32,
    next_defender_id: u32,
    next_railgun_id: u32,
    game_over: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a new world with the default playfield and city count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Creates a new world whose per-frame randomness derives from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let mut world = Self {
            field: DEFAULT_FIELD,
            clock: Duration::ZERO,
            cities: Vec::new(),
            towers: TowerRegistry::new(),
            trucks: Vec::new(),
            railguns: Vec::new(),
            defenders: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            bolts: Vec::new(),
            explosions: Vec::new(),
            progression: ProgressionSnapshot::at_wave(1),
            grid: SpatialHash::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_enemy_id: 0,
            next_defender_id: 0,
            next_railgun_id: 0,
            game_over: false,
        };
        world.rebuild_topology(DEFAULT_CITY_COUNT);
        world
    }

    fn now(&self) -> f32 {
        self.clock.as_secs_f32()
    }

    fn city(&self, id: CityId) -> Option<&CityState> {
        self.cities.get(id.get() as usize)
    }

    fn city_mut(&mut self, id: CityId) -> Option<&mut CityState> {
        self.cities.get_mut(id.get() as usize)
    }

    fn city_alive(&self, id: CityId) -> bool {
        self.city(id).map_or(false, CityState::is_alive)
    }

    fn rebuild_topology(&mut self, count: u32) {
        let count = count.clamp(1, MAX_CITIES);
        let previous = std::mem::take(&mut self.cities);
        self.towers.clear();
        self.trucks.clear();
        self.railguns.clear();
        self.defenders.clear();

        for (index, position) in cities::layout(self.field, count).into_iter().enumerate() {
            let mut city = CityState::new(CityId::new(index as u32), position);
            if let Some(old) = previous.get(index) {
                city.inherit(old, count);
            }
            self.cities.push(city);
        }

        let tower_y = self.field.height - TOWER_GROUND_OFFSET;
        for city in self.cities.iter().filter(|city| city.is_alive()) {
            for side in [Side::Left, Side::Right] {
                let x = city.position.x + side.outward_sign() * TOWER_OFFSET;
                let _ = self
                    .towers
                    .insert(city.id, side, Vec2::new(x, tower_y), STANDARD_TOWER);
            }
        }

        for index in 1..self.cities.len() {
            let id = TruckId::new(index as u32 - 1);
            let left = CityId::new(index as u32 - 1);
            let right = CityId::new(index as u32);
            self.trucks.push(TruckState::new(id, left, right));
            self.cities[index - 1].right_truck = Some(id);
            self.cities[index].left_truck = Some(id);
        }

        let flanks = [
            (self.cities.first().map(|city| (city.id, city.position)), Side::Left),
            (self.cities.last().map(|city| (city.id, city.position)), Side::Right),
        ];
        for (anchor, side) in flanks {
            let Some((city, position)) = anchor else {
                continue;
            };
            if !self.city_alive(city) {
                continue;
            }
            let id = RailgunId::new(self.next_railgun_id);
            self.next_railgun_id = self.next_railgun_id.saturating_add(1);
            let x = position.x + side.outward_sign() * RAILGUN_OFFSET;
            let y = self.field.height - RAILGUN_GROUND_OFFSET;
            self.railguns
                .push(RailgunState::new(id, city, side, Vec2::new(x, y)));
        }
        log::debug!("laid out {count} cities on a {:?} field", self.field);
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });
        let seconds = dt.as_secs_f32();
        if seconds <= 0.0 {
            return;
        }
        let now = self.now();
        let field = self.field;

        for city in &mut self.cities {
            city.tick_communication(seconds);
        }
        for tower in self.towers.iter_mut() {
            tower.cooldown = (tower.cooldown - seconds).max(0.0);
        }
        for truck in &mut self.trucks {
            if truck.cool_down(seconds) {
                log::debug!("truck {:?} available again", truck.id);
                out_events.push(Event::TruckAvailable { truck: truck.id });
            }
        }

        for enemy in self.enemies.iter_mut().filter(|enemy| enemy.active) {
            let jitter = self.rng.gen_range(-1.0f32..=1.0);
            enemy.advance(seconds, now, jitter, field);
            if enemy.is_out_of_bounds(field) {
                enemy.active = false;
                out_events.push(Event::EnemyDestroyed {
                    enemy: enemy.id,
                    cause: DestructionCause::OutOfBounds,
                });
            }
        }

        for projectile in self.projectiles.iter_mut().filter(|p| p.active) {
            projectile.advance(seconds);
        }
        for bolt in self.bolts.iter_mut().filter(|bolt| bolt.active) {
            bolt.advance(seconds);
        }
        for explosion in self.explosions.iter_mut().filter(|e| e.active) {
            explosion.advance(seconds);
        }

        for railgun in &mut self.railguns {
            if let Some(angle) = railgun.update(seconds, &self.enemies) {
                self.bolts
                    .push(RailgunBolt::new(railgun.position, angle, RAILGUN_DAMAGE));
                out_events.push(Event::RailgunFired {
                    railgun: railgun.id,
                    angle,
                });
            }
        }

        self.advance_defenders(seconds, out_events);
    }

    fn advance_defenders(&mut self, seconds: f32, out_events: &mut Vec<Event>) {
        let tower_y = self.field.height - TOWER_GROUND_OFFSET;
        for index in 0..self.defenders.len() {
            if !self.defenders[index].active {
                continue;
            }
            match self.defenders[index].advance(seconds) {
                DefenderProgress::Travelling | DefenderProgress::Deployed => {}
                DefenderProgress::Arrived => {
                    let defender = &self.defenders[index];
                    let requester = defender.requester;
                    let position = Vec2::new(defender.position.x, tower_y);
                    if !self.city_alive(requester) {
                        self.defenders[index].active = false;
                        continue;
                    }
                    let side = match self.city(requester) {
                        Some(city) if position.x < city.position.x => Side::Left,
                        _ => Side::Right,
                    };
                    let tower = self.towers.insert(requester, side, position, FLAK_TOWER);
                    let defender = &mut self.defenders[index];
                    defender.tower = Some(tower);
                    log::debug!("defender {:?} deployed flak tower {tower:?}", defender.id);
                    out_events.push(Event::DefenderDeployed {
                        defender: defender.id,
                        tower,
                    });
                }
                DefenderProgress::Expired => {
                    let defender = &self.defenders[index];
                    let id = defender.id;
                    if let Some(tower) = defender.tower {
                        if self.towers.destroy(tower) {
                            out_events.push(Event::TowerDestroyed { tower });
                        }
                    }
                    out_events.push(Event::DefenderExpired { defender: id });
                }
            }
        }
    }

    fn spawn_enemy(&mut self, gimmick: Arc<Gimmick>, x: f32, boss: bool, out: &mut Vec<Event>) {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.saturating_add(1);
        let enemy = EnemyState::spawn(id, gimmick, x, boss, self.now(), self.field);
        log::debug!(
            "spawned {} as {id:?} at x={:.1}{}",
            enemy.gimmick.name,
            enemy.motion.position.x,
            if boss { " (boss)" } else { "" }
        );
        self.enemies.push(enemy);
        out.push(Event::EnemySpawned { enemy: id, boss });
    }

    fn fire_projectile(&mut self, tower: TowerId, aim: Vec2, out: &mut Vec<Event>) {
        let rejection = match self.towers.get(tower) {
            None => Some(FireRejection::MissingTower),
            Some(state) if !state.can_act() => Some(FireRejection::Offline),
            Some(state) if !state.is_ready() => Some(FireRejection::CoolingDown),
            Some(_) => None,
        };
        if let Some(reason) = rejection {
            log::debug!("tower {tower:?} cannot fire: {reason:?}");
            out.push(Event::FireRejected { tower, reason });
            return;
        }
        let Some(state) = self.towers.get_mut(tower) else {
            return;
        };
        let aim = skyline_defence_core::math::finite_or_zero(aim);
        state.cooldown = 1.0 / state.profile.fire_rate;
        self.projectiles.push(Projectile::new(
            tower,
            state.position,
            aim,
            state.profile.damage,
            state.profile.flak,
        ));
        out.push(Event::ProjectileFired { tower, aim });
    }

    fn resolve_collisions(&mut self, dt: Duration, settings: Settings, out: &mut Vec<Event>) {
        self.rebuild_grid();
        self.detonate_projectiles(out);
        self.resolve_bolts(out);
        self.resolve_ground_impacts(out);
        self.repair(dt.as_secs_f32(), settings.repair_rate_multiplier, out);
        self.check_game_over(out);
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (index, enemy) in self.enemies.iter().enumerate() {
            if enemy.active {
                self.grid
                    .insert(index as u32, enemy.motion.position, enemy.motion.radius);
            }
        }
    }

    fn detonate_projectiles(&mut self, out: &mut Vec<Event>) {
        for index in 0..self.projectiles.len() {
            let projectile = &self.projectiles[index];
            if !projectile.active {
                continue;
            }
            let position = projectile.position;
            let direct_hit = self
                .grid
                .retrieve(position.x, position.y, PROJECTILE_RADIUS)
                .into_iter()
                .filter_map(|candidate| self.enemies.get(candidate as usize))
                .any(|enemy| {
                    enemy.active
                        && circle_circle(
                            position,
                            PROJECTILE_RADIUS,
                            enemy.motion.position,
                            enemy.motion.radius,
                        )
                        .colliding
                });
            if !direct_hit && !projectile.arrived {
                continue;
            }

            let projectile = &mut self.projectiles[index];
            projectile.active = false;
            let (radius, damage, tower) =
                (projectile.blast_radius, projectile.damage, projectile.tower);
            log::trace!("projectile from {tower:?} detonated at {position}");
            self.explode(position, radius, ExplosionKind::Interception, out);

            for candidate in self.grid.retrieve(position.x, position.y, radius) {
                let Some(enemy) = self.enemies.get_mut(candidate as usize) else {
                    continue;
                };
                let caught = enemy.active
                    && circle_circle(position, radius, enemy.motion.position, enemy.motion.radius)
                        .colliding;
                if caught && enemy.take_damage(damage) {
                    out.push(Event::EnemyDestroyed {
                        enemy: enemy.id,
                        cause: DestructionCause::Intercepted,
                    });
                }
            }
        }
    }

    fn resolve_bolts(&mut self, out: &mut Vec<Event>) {
        let bounds = self.field;
        for bolt in self.bolts.iter_mut().filter(|bolt| bolt.active) {
            let midpoint = (bolt.previous + bolt.position) * 0.5;
            let reach = bolt.previous.distance(bolt.position) * 0.5 + BOLT_RADIUS;
            let mut hits: Vec<(f32, usize)> = self
                .grid
                .retrieve(midpoint.x, midpoint.y, reach)
                .into_iter()
                .map(|candidate| candidate as usize)
                .filter_map(|index| {
                    let enemy = self.enemies.get(index)?;
                    let crossed = enemy.active
                        && !bolt.has_pierced(enemy.id)
                        && circle_segment(
                            enemy.motion.position,
                            enemy.motion.radius + BOLT_RADIUS,
                            bolt.previous,
                            bolt.position,
                        );
                    crossed.then(|| {
                        let along = (enemy.motion.position - bolt.previous).dot(bolt.direction);
                        (along, index)
                    })
                })
                .collect();
            hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for (_, index) in hits {
                let damage = bolt.next_damage();
                let enemy = &mut self.enemies[index];
                bolt.pierced.push(enemy.id);
                let position = enemy.motion.position;
                self.explosions.push(Explosion::new(
                    position,
                    RAILGUN_FLASH_RADIUS,
                    ExplosionKind::Railgun,
                ));
                out.push(Event::ExplosionCreated {
                    position,
                    kind: ExplosionKind::Railgun,
                });
                if enemy.take_damage(damage) {
                    out.push(Event::EnemyDestroyed {
                        enemy: enemy.id,
                        cause: DestructionCause::Railgun,
                    });
                }
            }

            let p = bolt.position;
            if p.x < -BOLT_MARGIN
                || p.x > bounds.width + BOLT_MARGIN
                || p.y < -BOLT_MARGIN
                || p.y > bounds.height + BOLT_MARGIN
            {
                bolt.active = false;
            }
        }
    }

    fn resolve_ground_impacts(&mut self, out: &mut Vec<Event>) {
        let ground = self.field.ground_line();
        for index in 0..self.enemies.len() {
            let enemy = &mut self.enemies[index];
            if !enemy.active || enemy.motion.position.y < ground {
                continue;
            }
            enemy.active = false;
            let (id, position) = (enemy.id, enemy.motion.position);
            let severity = enemy.max_health * IMPACT_SEVERITY * enemy.impact_multiplier;
            out.push(Event::EnemyDestroyed {
                enemy: id,
                cause: DestructionCause::GroundImpact,
            });
            self.explode(position, IMPACT_BLAST_RADIUS, ExplosionKind::GroundImpact, out);

            let struck = self
                .cities
                .iter()
                .filter(|city| city.is_alive())
                .map(|city| (city.id, (city.position.x - position.x).abs()))
                .filter(|(_, dx)| *dx < CITY_IMPACT_REACH)
                .fold(None, |best: Option<(CityId, f32)>, candidate| match best {
                    Some(current) if current.1 <= candidate.1 => Some(current),
                    _ => Some(candidate),
                });
            let (city, damage) = match struck {
                Some((city, dx)) => (Some(city), falloff(severity, dx, CITY_IMPACT_REACH)),
                None => (None, 0),
            };
            out.push(Event::GroundImpact {
                enemy: id,
                position,
                city,
                damage,
            });
            if let Some(city) = city {
                let destroyed = self
                    .city_mut(city)
                    .map_or(false, |state| state.take_damage(damage as f32));
                if destroyed {
                    self.collapse_city(city, out);
                }
            }

            self.strike_structures(position.x, severity, out);
        }
    }

    fn strike_structures(&mut self, x: f32, severity: f32, out: &mut Vec<Event>) {
        for tower in self.towers.iter_mut().filter(|tower| !tower.destroyed) {
            let dx = (tower.position.x - x).abs();
            if dx < STRUCTURE_IMPACT_REACH
                && tower.take_damage(falloff(severity, dx, STRUCTURE_IMPACT_REACH) as f32)
            {
                log::debug!("tower {:?} knocked offline", tower.id);
                out.push(Event::TowerOffline { tower: tower.id });
            }
        }
        for railgun in &mut self.railguns {
            let dx = (railgun.position.x - x).abs();
            if dx < STRUCTURE_IMPACT_REACH
                && railgun.take_damage(falloff(severity, dx, STRUCTURE_IMPACT_REACH) as f32)
            {
                log::info!("railgun {:?} destroyed", railgun.id);
                out.push(Event::RailgunDestroyed {
                    railgun: railgun.id,
                });
            }
        }
    }

    fn repair(&mut self, seconds: f32, multiplier: f32, out: &mut Vec<Event>) {
        if seconds <= 0.0 {
            return;
        }
        let scale = multiplier.max(0.0) * seconds;
        for city in &mut self.cities {
            city.heal(city.repair_rate * scale);
        }
        for tower in self.towers.iter_mut() {
            let Some(owner) = self.cities.get(tower.city.get() as usize) else {
                continue;
            };
            if !owner.is_alive() {
                continue;
            }
            if tower.repair(owner.repair_rate * TOWER_REPAIR_SHARE * scale) {
                log::debug!("tower {:?} back online", tower.id);
                out.push(Event::TowerOnline { tower: tower.id });
            }
        }
    }

    fn check_game_over(&mut self, out: &mut Vec<Event>) {
        if self.game_over || self.cities.iter().any(CityState::is_alive) {
            return;
        }
        self.game_over = true;
        log::info!("every city has fallen at wave {}", self.progression.wave);
        out.push(Event::GameOver {
            wave: self.progression.wave,
        });
    }

    fn explode(&mut self, position: Vec2, radius: f32, kind: ExplosionKind, out: &mut Vec<Event>) {
        self.explosions.push(Explosion::new(position, radius, kind));
        out.push(Event::ExplosionCreated { position, kind });
    }

    /// Tears down everything a fallen city owns. Callers mark the city
    /// destroyed first.
    fn collapse_city(&mut self, city: CityId, out: &mut Vec<Event>) {
        log::info!("city {} destroyed", city.get());
        out.push(Event::CityDestroyed { city });
        for tower in self.towers.owned_by(city) {
            if self.towers.destroy(tower) {
                out.push(Event::TowerDestroyed { tower });
            }
        }
        for railgun in self.railguns.iter_mut().filter(|r| r.city == city) {
            if !railgun.destroyed {
                railgun.destroyed = true;
                out.push(Event::RailgunDestroyed {
                    railgun: railgun.id,
                });
            }
        }
        for defender in self.defenders.iter_mut().filter(|d| d.requester == city) {
            defender.active = false;
        }
    }

    fn destroy_city(&mut self, city: CityId, out: &mut Vec<Event>) {
        let Some(state) = self.city_mut(city) else {
            return;
        };
        if state.take_damage(state.health.max(1.0)) {
            self.collapse_city(city, out);
            self.check_game_over(out);
        }
    }

    fn destroy_tower(&mut self, tower: TowerId, out: &mut Vec<Event>) {
        if !self.towers.destroy(tower) {
            return;
        }
        out.push(Event::TowerDestroyed { tower });
        for defender in self.defenders.iter_mut() {
            if defender.tower == Some(tower) {
                defender.active = false;
            }
        }
    }

    fn deploy_truck(
        &mut self,
        truck: TruckId,
        requester: CityId,
        helper: CityId,
        target_x: f32,
        out: &mut Vec<Event>,
    ) {
        let rejection = match self.trucks.get(truck.get() as usize) {
            None => Some(TruckRejection::MissingTruck),
            Some(state) if requester == helper || !state.joins(requester, helper) => {
                Some(TruckRejection::NotShared)
            }
            Some(_) if !self.city_alive(requester) || !self.city_alive(helper) => {
                Some(TruckRejection::CityDestroyed)
            }
            Some(state) if !state.available => Some(TruckRejection::CoolingDown),
            Some(_) => None,
        };
        if let Some(reason) = rejection {
            log::warn!("truck {truck:?} deployment rejected: {reason:?}");
            out.push(Event::TruckRejected { truck, reason });
            return;
        }

        let origin = match self.city(requester) {
            Some(city) => Vec2::new(city.position.x, self.field.height - TOWER_GROUND_OFFSET),
            None => return,
        };
        if let Some(state) = self.trucks.get_mut(truck.get() as usize) {
            state.dispatch();
        }
        let target_x = if target_x.is_finite() {
            target_x.clamp(0.0, self.field.width)
        } else {
            origin.x
        };
        let defender = DefenderId::new(self.next_defender_id);
        self.next_defender_id = self.next_defender_id.saturating_add(1);
        self.defenders.push(DefenderState::new(
            defender, truck, requester, origin, target_x,
        ));

        if let Some(city) = self.city_mut(requester) {
            city.adjust_ledger(helper, -1);
            city.adjust_helpfulness(REQUESTER_GOODWILL);
            city.begin_communication(helper);
        }
        if let Some(city) = self.city_mut(helper) {
            city.adjust_ledger(requester, 1);
            city.adjust_helpfulness(HELPER_GOODWILL);
            city.begin_communication(requester);
        }
        log::debug!(
            "city {} sent truck {:?} to help city {} at x={target_x:.1}",
            helper.get(),
            truck,
            requester.get()
        );
        out.push(Event::TruckDeployed {
            truck,
            requester,
            helper,
            defender,
        });
    }

    fn record_refusal(&mut self, requester: CityId, neighbor: CityId, out: &mut Vec<Event>) {
        if requester == neighbor || self.city(requester).is_none() || self.city(neighbor).is_none()
        {
            return;
        }
        if let Some(city) = self.city_mut(requester) {
            city.adjust_ledger(neighbor, 1);
            city.begin_communication(neighbor);
        }
        if let Some(city) = self.city_mut(neighbor) {
            city.adjust_ledger(requester, -1);
            city.adjust_helpfulness(REFUSAL_PENALTY);
            city.begin_communication(requester);
        }
        log::debug!(
            "city {} refused to help city {}",
            neighbor.get(),
            requester.get()
        );
        out.push(Event::AssistanceRefused {
            requester,
            neighbor,
        });
    }

    fn cast_votes(&mut self, votes: Vec<SuperWeaponVote>) {
        for ballot in votes {
            if let Some(city) = self.city_mut(ballot.city) {
                city.super_weapon_vote = ballot.vote;
                city.concern = skyline_defence_core::math::finite_scalar(ballot.concern)
                    .clamp(0.0, 100.0);
            }
        }
    }

    fn fire_super_weapon(&mut self, out: &mut Vec<Event>) {
        if !self.progression.super_weapon_armed {
            log::warn!("super-weapon fire requested while disarmed");
            return;
        }
        let era = self.progression.era;
        let kind = ExplosionKind::SuperWeapon(era);
        let mut destroyed = 0u32;
        for index in 0..self.enemies.len() {
            let enemy = &mut self.enemies[index];
            if !enemy.active {
                continue;
            }
            enemy.active = false;
            destroyed = destroyed.saturating_add(1);
            let (id, position) = (enemy.id, enemy.motion.position);
            out.push(Event::EnemyDestroyed {
                enemy: id,
                cause: DestructionCause::SuperWeapon,
            });
            self.explode(position, SUPER_WEAPON_BLAST_RADIUS, kind, out);
        }
        for city in self.cities.iter_mut().filter(|city| city.is_alive()) {
            city.heal(SUPER_WEAPON_HEAL);
            city.adjust_helpfulness(SUPER_WEAPON_GOODWILL);
            city.super_weapon_vote = false;
        }
        self.progression.super_weapon_armed = false;
        log::info!("super-weapon fired in {era:?}, {destroyed} enemies destroyed");
        out.push(Event::SuperWeaponFired { era, destroyed });
    }

    fn advance_to_wave(&mut self, wave: u32, out: &mut Vec<Event>) {
        let previous = self.progression;
        let mut next = ProgressionSnapshot::at_wave(wave.max(1));
        let era_changed = next.era != previous.era;
        next.super_weapon_armed = era_changed || previous.super_weapon_armed;
        self.progression = next;
        out.push(Event::WaveStarted { progression: next });
        if era_changed {
            log::info!("entering era {:?} at wave {}", next.era, next.wave);
            out.push(Event::EraChanged { era: next.era });
        }
    }

    fn complete_wave(&mut self, out: &mut Vec<Event>) {
        let wave = self.progression.wave;
        log::info!("wave {wave} complete");
        out.push(Event::WaveCompleted { wave });
        self.advance_to_wave(wave.saturating_add(1), out);
    }

    fn advance_era(&mut self, out: &mut Vec<Event>) {
        match self.progression.era.next() {
            Some(era) => self.advance_to_wave(first_wave_of_era(era), out),
            None => log::debug!("already in the final era"),
        }
    }

    fn clear_enemies(&mut self, out: &mut Vec<Event>) {
        for enemy in self.enemies.iter_mut().filter(|enemy| enemy.active) {
            enemy.active = false;
            out.push(Event::EnemyDestroyed {
                enemy: enemy.id,
                cause: DestructionCause::Cleared,
            });
        }
    }

    fn sweep(&mut self) {
        retain_active(&mut self.enemies);
        retain_active(&mut self.projectiles);
        retain_active(&mut self.bolts);
        retain_active(&mut self.explosions);
        retain_active(&mut self.defenders);
        self.towers.sweep();
        self.railguns.retain(|railgun| !railgun.destroyed);
    }
}

/// Impact damage scaled linearly by horizontal distance, rounded up.
fn falloff(severity: f32, dx: f32, reach: f32) -> u32 {
    let scaled = severity * (1.0 - dx / reach).max(0.0);
    if scaled.is_finite() {
        scaled.ceil() as u32
    } else {
        0
    }
}

fn retain_active<T: Body>(items: &mut Vec<T>) {
    items.retain(|item| item.is_active());
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureField { width, height } => {
            if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                log::warn!("ignoring invalid field size {width}x{height}");
                return;
            }
            world.field = Field::new(width, height);
            let count = world.cities.len() as u32;
            world.rebuild_topology(count);
            out_events.push(Event::TopologyRebuilt {
                cities: world.cities.len() as u32,
            });
        }
        Command::ConfigureCities { count } => {
            world.rebuild_topology(count);
            out_events.push(Event::TopologyRebuilt {
                cities: world.cities.len() as u32,
            });
        }
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SpawnEnemy { gimmick, x, boss } => world.spawn_enemy(gimmick, x, boss, out_events),
        Command::FireProjectile { tower, aim } => world.fire_projectile(tower, aim, out_events),
        Command::ResolveCollisions { dt, settings } => {
            world.resolve_collisions(dt, settings, out_events);
        }
        Command::DeploySharedTruck {
            truck,
            requester,
            helper,
            target_x,
        } => world.deploy_truck(truck, requester, helper, target_x, out_events),
        Command::RecordRefusal {
            requester,
            neighbor,
        } => world.record_refusal(requester, neighbor, out_events),
        Command::CastSuperWeaponVotes { votes } => world.cast_votes(votes),
        Command::FireSuperWeapon => world.fire_super_weapon(out_events),
        Command::CompleteWave => world.complete_wave(out_events),
        Command::AdvanceEra => world.advance_era(out_events),
        Command::ClearEnemies => world.clear_enemies(out_events),
        Command::DestroyCity { city } => world.destroy_city(city, out_events),
        Command::DestroyTower { tower } => world.destroy_tower(tower, out_events),
        Command::Sweep => world.sweep(),
    }
}

impl Body for CityState {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        cities::CITY_WIDTH * 0.5
    }

    fn is_active(&self) -> bool {
        self.is_alive()
    }
}

impl Body for towers::TowerState {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        if self.profile.flak {
            8.0
        } else {
            12.0
        }
    }

    fn is_active(&self) -> bool {
        !self.destroyed
    }
}

impl Body for RailgunState {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        14.0
    }

    fn is_active(&self) -> bool {
        !self.destroyed
    }
}

impl Body for DefenderState {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        trucks::DEFENDER_RADIUS
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Body for EnemyState {
    fn position(&self) -> Vec2 {
        self.motion.position
    }

    fn radius(&self) -> f32 {
        self.motion.radius
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Body for Projectile {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        PROJECTILE_RADIUS
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Body for RailgunBolt {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        BOLT_RADIUS
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Body for Explosion {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        Explosion::radius(self)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use skyline_defence_core::{
        CityId, CityView, DefenderSnapshot, EnemyView, EntityFrame, EntityKind, ExplosionKind,
        Field, FrameSnapshot, ProgressionSnapshot, RailgunSnapshot, TowerView, TruckView, Vec2,
    };
    use skyline_defence_system_collision::Rect;

    use super::{cities, Body, World};

    /// Dimensions of the playfield.
    #[must_use]
    pub fn field(world: &World) -> Field {
        world.field
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Current wave, level, era, and super-weapon state.
    #[must_use]
    pub fn progression(world: &World) -> ProgressionSnapshot {
        world.progression
    }

    /// Captures every city, fallen ones included.
    #[must_use]
    pub fn city_view(world: &World) -> CityView {
        CityView::from_snapshots(
            world
                .cities
                .iter()
                .map(|city| city.snapshot(world.towers.active_count(city.id)))
                .collect(),
        )
    }

    /// Captures every standing tower.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(
            world
                .towers
                .iter()
                .filter(|tower| !tower.destroyed)
                .map(|tower| tower.snapshot())
                .collect(),
        )
    }

    /// Captures every active enemy.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .filter(|enemy| enemy.active)
                .map(|enemy| enemy.snapshot())
                .collect(),
        )
    }

    /// Captures every shared truck.
    #[must_use]
    pub fn truck_view(world: &World) -> TruckView {
        TruckView::from_snapshots(world.trucks.iter().map(|truck| truck.snapshot()).collect())
    }

    /// Captures every standing railgun in identifier order.
    #[must_use]
    pub fn railguns(world: &World) -> Vec<RailgunSnapshot> {
        world
            .railguns
            .iter()
            .filter(|railgun| !railgun.destroyed)
            .map(|railgun| railgun.snapshot())
            .collect()
    }

    /// Captures every active mobile defender in identifier order.
    #[must_use]
    pub fn defenders(world: &World) -> Vec<DefenderSnapshot> {
        world
            .defenders
            .iter()
            .filter(|defender| defender.active)
            .map(|defender| defender.snapshot())
            .collect()
    }

    /// Number of enemies still in play.
    #[must_use]
    pub fn active_enemy_count(world: &World) -> usize {
        world.enemies.iter().filter(|enemy| enemy.active).count()
    }

    /// Number of cities still standing.
    #[must_use]
    pub fn living_city_count(world: &World) -> usize {
        world.cities.iter().filter(|city| city.is_alive()).count()
    }

    /// Reports whether every city has fallen.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Footprints of the standing cities.
    #[must_use]
    pub fn city_footprints(world: &World) -> Vec<(CityId, Rect)> {
        world
            .cities
            .iter()
            .filter(|city| city.is_alive())
            .map(|city| {
                let size = Vec2::new(cities::CITY_WIDTH, cities::CITY_HEIGHT);
                (city.id, Rect::centered(city.position, size))
            })
            .collect()
    }

    /// Describes every active entity for a renderer.
    #[must_use]
    pub fn frame_snapshot(world: &World) -> FrameSnapshot {
        let mut entities = Vec::new();
        for city in world.cities.iter().filter(|city| city.is_active()) {
            let state = if city.communicating_with.is_some() {
                "communicating"
            } else {
                "standing"
            };
            entities.push(frame(
                EntityKind::City,
                city,
                Some((city.health, city.max_health)),
                state,
            ));
        }
        for tower in world.towers.iter().filter(|tower| tower.is_active()) {
            let state = if tower.online { "online" } else { "offline" };
            entities.push(frame(
                EntityKind::Tower,
                tower,
                Some((tower.health, tower.profile.max_health)),
                state,
            ));
        }
        for railgun in world.railguns.iter().filter(|r| r.is_active()) {
            let state = if railgun.charge >= 1.0 {
                "ready"
            } else {
                "charging"
            };
            entities.push(frame(
                EntityKind::Railgun,
                railgun,
                Some((railgun.health, super::railguns::RAILGUN_MAX_HEALTH)),
                state,
            ));
        }
        for defender in world.defenders.iter().filter(|d| d.is_active()) {
            let state = if defender.tower.is_some() {
                "deployed"
            } else {
                "moving"
            };
            entities.push(frame(EntityKind::Defender, defender, None, state));
        }
        for enemy in world.enemies.iter().filter(|e| e.is_active()) {
            let state = if enemy.boss {
                "boss"
            } else {
                enemy.behavior.tag()
            };
            entities.push(frame(
                EntityKind::Enemy,
                enemy,
                Some((enemy.health, enemy.max_health)),
                state,
            ));
        }
        for projectile in world.projectiles.iter().filter(|p| p.is_active()) {
            entities.push(frame(EntityKind::Projectile, projectile, None, "flying"));
        }
        for bolt in world.bolts.iter().filter(|b| b.is_active()) {
            entities.push(frame(EntityKind::RailgunBolt, bolt, None, "flying"));
        }
        for explosion in world.explosions.iter().filter(|e| e.is_active()) {
            let state = match explosion.kind {
                _ if explosion.is_fading() => "fading",
                ExplosionKind::Interception => "interception",
                ExplosionKind::GroundImpact => "impact",
                ExplosionKind::Railgun => "railgun",
                ExplosionKind::SuperWeapon(_) => "super_weapon",
            };
            entities.push(frame(EntityKind::Explosion, explosion, None, state));
        }
        FrameSnapshot {
            field: world.field,
            progression: world.progression,
            entities,
        }
    }

    fn frame<T: Body>(
        kind: EntityKind,
        body: &T,
        health: Option<(f32, f32)>,
        state: &'static str,
    ) -> EntityFrame {
        EntityFrame {
            kind,
            position: body.position(),
            radius: body.radius(),
            health,
            state,
        }
    }
}
