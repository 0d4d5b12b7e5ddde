#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that lets every city's defence AI pick targets for its towers.
//!
//! Each living city is driven by an agent that wakes up once its reaction time
//! has elapsed, scores every active enemy for each of its online towers, and
//! emits a [`TowerTarget`] with a predicted aim point.
//! Aim error is drawn from a seeded stream so replays stay deterministic.

use std::{collections::BTreeMap, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skyline_defence_core::{
    math::{direction, finite_or_zero, intercept_point, linear_lead, PROJECTILE_SPEED},
    CityId, CityView, EnemyId, EnemySnapshot, EnemyView, Field, ProgressionSnapshot, Settings,
    TowerSnapshot, TowerTarget, TowerView, Vec2, BOSS_CLASS_HEALTH,
};

const MAX_REACTION_MS: f32 = 200.0;
const REACTION_SPAN_MS: f32 = 150.0;
const PERFECT_ACCURACY: f32 = 0.99;
const MAX_AIM_ERROR: f32 = 60.0;
const EXPANDING_AIM_OFFSET: f32 = 0.8;
const THREAT_RADIUS: f32 = 400.0;
const BASELINE_RADIUS: f32 = 800.0;
const UPPER_FIELD_SHARE: f32 = 0.3;

/// Configuration parameters required to construct the targeting system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed for aim error.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Snapshot of the world the targeting pass reads.
#[derive(Clone, Copy, Debug)]
pub struct TargetingContext<'a> {
    /// Simulated clock.
    pub now: Duration,
    /// Current progression state.
    pub progression: ProgressionSnapshot,
    /// Settings in force this frame.
    pub settings: &'a Settings,
    /// Playfield dimensions.
    pub field: Field,
    /// Every city, fallen ones included.
    pub cities: &'a CityView,
    /// Every standing tower.
    pub towers: &'a TowerView,
    /// Every active enemy.
    pub enemies: &'a EnemyView,
}

#[derive(Clone, Copy, Debug)]
struct CityAgent {
    difficulty: f32,
    coordination: f32,
    last_reaction: Option<Duration>,
    last_target: Option<EnemyId>,
}

impl CityAgent {
    fn new() -> Self {
        Self {
            difficulty: 0.5,
            coordination: 0.0,
            last_reaction: None,
            last_target: None,
        }
    }

    fn should_react(&self, now: Duration) -> bool {
        match self.last_reaction {
            None => true,
            Some(last) => now.saturating_sub(last) > reaction_time(self.difficulty),
        }
    }
}

/// Tower targeting system holding one agent per living city.
#[derive(Debug)]
pub struct TowerTargeting {
    agents: BTreeMap<CityId, CityAgent>,
    rng: ChaCha8Rng,
}

impl TowerTargeting {
    /// Creates a new targeting system seeded for deterministic aim error.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            agents: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Computes tower targets for every agent whose reaction time elapsed.
    ///
    /// The output buffer is cleared before populating it. Targets are ordered
    /// by city and then by tower identifier.
    pub fn handle(&mut self, context: TargetingContext<'_>, out: &mut Vec<TowerTarget>) {
        out.clear();
        self.agents
            .retain(|id, _| context.cities.get(*id).is_some_and(|city| city.is_alive()));

        if context.enemies.is_empty() || context.towers.is_empty() {
            return;
        }

        let difficulty = unit_interval(context.settings.difficulty, 0.5);
        let accuracy = unit_interval(context.settings.ai_accuracy, 0.85);
        let coordination =
            coordination_level(context.progression, context.settings.coordination_override);

        for city in context.cities.iter().filter(|city| city.is_alive()) {
            let agent = self.agents.entry(city.id).or_insert_with(CityAgent::new);
            agent.difficulty = difficulty;
            agent.coordination = coordination;
            if !agent.should_react(context.now) {
                continue;
            }
            agent.last_reaction = Some(context.now);

            let mut strongest: Option<(f32, EnemyId)> = None;
            for tower in context
                .towers
                .iter()
                .filter(|tower| tower.city == city.id && tower.online)
            {
                let Some((score, enemy)) = select_target(tower, agent, &context) else {
                    continue;
                };
                let aim = aim_point(tower.position, enemy, accuracy, &mut self.rng);
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: enemy.id,
                    aim,
                });
                if strongest.map_or(true, |(best, _)| score > best) {
                    strongest = Some((score, enemy.id));
                }
            }
            if let Some((_, enemy)) = strongest {
                agent.last_target = Some(enemy);
            }
        }
    }
}

/// Delay between two decisions of an agent at the given difficulty.
#[must_use]
pub fn reaction_time(difficulty: f32) -> Duration {
    let difficulty = unit_interval(difficulty, 0.5);
    let millis = MAX_REACTION_MS - difficulty * REACTION_SPAN_MS;
    Duration::from_micros((millis * 1_000.0).round() as u64)
}

/// How strongly agents stick to shared targets at the given progression.
#[must_use]
pub fn coordination_level(progression: ProgressionSnapshot, override_level: Option<f32>) -> f32 {
    if let Some(level) = override_level {
        return unit_interval(level, 0.0);
    }
    let veteran = if progression.wave > 5 { 0.3 } else { 0.0 };
    ((progression.level as f32 / 10.0) * 0.6 + veteran).min(1.0)
}

/// Predicts where a projectile fired from `muzzle` should detonate.
///
/// Expanding enemies are aimed at the rim facing the tower. Near-perfect
/// accuracy solves the exact interception; lower accuracy weakens the lead and
/// scatters the aim point.
pub fn aim_point<R: Rng>(muzzle: Vec2, enemy: &EnemySnapshot, accuracy: f32, rng: &mut R) -> Vec2 {
    if enemy.behavior.is_expanding() {
        return enemy.position
            + direction(enemy.position, muzzle) * EXPANDING_AIM_OFFSET * enemy.radius;
    }

    let velocity = finite_or_zero(enemy.velocity);
    let accuracy = unit_interval(accuracy, 0.85);
    if accuracy >= PERFECT_ACCURACY {
        return intercept_point(muzzle, enemy.position, velocity, PROJECTILE_SPEED);
    }

    let lead = linear_lead(muzzle, enemy.position, velocity, PROJECTILE_SPEED) - enemy.position;
    let effectiveness = 0.4 + 0.6 * accuracy;
    let spread = (1.0 - accuracy) * MAX_AIM_ERROR;
    let error = if spread > 0.0 {
        Vec2::new(rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread))
    } else {
        Vec2::ZERO
    };
    enemy.position + lead * effectiveness + error
}

fn select_target<'a>(
    tower: &TowerSnapshot,
    agent: &CityAgent,
    context: &TargetingContext<'a>,
) -> Option<(f32, &'a EnemySnapshot)> {
    let mut best: Option<(f32, &EnemySnapshot)> = None;
    for enemy in context.enemies.iter() {
        let Some(score) = score(tower, enemy, agent, context) else {
            continue;
        };
        if best.map_or(true, |(current, _)| score > current) {
            best = Some((score, enemy));
        }
    }
    best
}

fn score(
    tower: &TowerSnapshot,
    enemy: &EnemySnapshot,
    agent: &CityAgent,
    context: &TargetingContext<'_>,
) -> Option<f32> {
    let mut score = 0.0;
    if tower.flak {
        let reach = tower.position.distance(enemy.position);
        if reach > tower.range {
            return None;
        }
        score += (tower.range - reach) * 3.0;
    }

    if enemy.behavior.is_expanding() {
        score += 500.0 + enemy.radius * 5.0;
    }
    if enemy.max_health > BOSS_CLASS_HEALTH {
        score += 150.0;
    }

    if let Some((city, gap)) = nearest_city(enemy.position, context.cities) {
        let heading = finite_or_zero(enemy.velocity).dot(city.1 - enemy.position);
        if gap <= THREAT_RADIUS && heading > 0.0 {
            score += 200.0 + (300.0 - gap).max(0.0);
            if tower.flak && city.0 == tower.city {
                score += 300.0;
            }
        } else {
            score += (BASELINE_RADIUS - gap).max(0.0) * 0.1;
        }
    }

    if !tower.flak {
        let covered = context.towers.iter().any(|other| {
            other.city == tower.city
                && other.online
                && other.position.distance(enemy.position) <= other.range
        });
        if covered {
            score += 80.0;
        }
        if enemy.position.y < context.field.height * UPPER_FIELD_SHARE {
            score += 60.0;
        }
    }

    if agent.last_target == Some(enemy.id) {
        score += agent.coordination * 50.0;
    }
    Some(score)
}

fn nearest_city(point: Vec2, cities: &CityView) -> Option<((CityId, Vec2), f32)> {
    cities
        .iter()
        .filter(|city| city.is_alive())
        .map(|city| ((city.id, city.position), city.position.distance(point)))
        .fold(None, |best, candidate| match best {
            Some((_, gap)) if gap <= candidate.1 => best,
            _ => Some(candidate),
        })
}

fn unit_interval(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use skyline_defence_core::{Behavior, CitySnapshot, Side, Stance, TowerId};

    use super::*;

    fn city(id: u32, x: f32) -> CitySnapshot {
        CitySnapshot {
            id: CityId::new(id),
            position: Vec2::new(x, 570.0),
            width: 60.0,
            health: 100.0,
            max_health: 100.0,
            destroyed: false,
            stance: Stance::Neutral,
            helpfulness: 0.0,
            ledger: BTreeMap::new(),
            left_truck: None,
            right_truck: None,
            communicating_with: None,
            super_weapon_vote: false,
            concern: 0.0,
            active_towers: 2,
        }
    }

    fn tower(id: u32, city: u32, x: f32, flak: bool) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            city: CityId::new(city),
            side: Side::Right,
            position: Vec2::new(x, 550.0),
            health: 100.0,
            max_health: 100.0,
            fire_rate: 1.5,
            range: if flak { 150.0 } else { 350.0 },
            damage: 35.0,
            flak,
            online: true,
            ready: true,
        }
    }

    fn enemy(id: u32, position: Vec2, behavior: Behavior) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            position,
            velocity: Vec2::new(0.0, 30.0),
            radius: 10.0,
            health: 20.0,
            max_health: 20.0,
            behavior,
            boss: false,
        }
    }

    struct Scene {
        settings: Settings,
        cities: CityView,
        towers: TowerView,
        enemies: EnemyView,
    }

    impl Scene {
        fn new(towers: Vec<TowerSnapshot>, enemies: Vec<EnemySnapshot>) -> Self {
            Self {
                settings: Settings::default(),
                cities: CityView::from_snapshots(vec![city(0, 200.0), city(1, 600.0)]),
                towers: TowerView::from_snapshots(towers),
                enemies: EnemyView::from_snapshots(enemies),
            }
        }

        fn context(&self, now: Duration) -> TargetingContext<'_> {
            TargetingContext {
                now,
                progression: ProgressionSnapshot::at_wave(1),
                settings: &self.settings,
                field: Field::new(800.0, 600.0),
                cities: &self.cities,
                towers: &self.towers,
                enemies: &self.enemies,
            }
        }
    }

    #[test]
    fn reaction_time_shrinks_with_difficulty() {
        assert_eq!(reaction_time(0.0), Duration::from_millis(200));
        assert_eq!(reaction_time(1.0), Duration::from_millis(50));
        assert_eq!(reaction_time(f32::NAN), reaction_time(0.5));
    }

    #[test]
    fn coordination_grows_with_level_and_honours_override() {
        assert!((coordination_level(ProgressionSnapshot::at_wave(1), None) - 0.06).abs() < 1e-6);
        assert!((coordination_level(ProgressionSnapshot::at_wave(10), None) - 0.48).abs() < 1e-6);
        assert_eq!(coordination_level(ProgressionSnapshot::at_wave(200), None), 1.0);
        assert_eq!(coordination_level(ProgressionSnapshot::at_wave(1), Some(0.25)), 0.25);
    }

    #[test]
    fn expanding_enemies_dominate_scoring() {
        let standard = tower(0, 0, 235.0, false);
        let scene = Scene::new(
            vec![standard],
            vec![
                enemy(0, Vec2::new(220.0, 300.0), Behavior::Falling),
                enemy(1, Vec2::new(700.0, 100.0), Behavior::Expanding),
            ],
        );
        let agent = CityAgent::new();
        let (_, chosen) =
            select_target(&standard, &agent, &scene.context(Duration::ZERO)).expect("target");
        assert_eq!(chosen.id, EnemyId::new(1));
    }

    #[test]
    fn flak_ignores_enemies_beyond_its_range() {
        let flak = tower(0, 0, 235.0, true);
        let scene = Scene::new(
            vec![flak],
            vec![enemy(0, Vec2::new(235.0, 200.0), Behavior::Falling)],
        );
        let agent = CityAgent::new();
        assert!(select_target(&flak, &agent, &scene.context(Duration::ZERO)).is_none());
    }

    #[test]
    fn equal_scores_keep_the_lowest_enemy_id() {
        let standard = tower(0, 0, 235.0, false);
        let scene = Scene::new(
            vec![standard],
            vec![
                enemy(4, Vec2::new(100.0, 250.0), Behavior::Falling),
                enemy(2, Vec2::new(100.0, 250.0), Behavior::Falling),
            ],
        );
        let agent = CityAgent::new();
        let (_, chosen) =
            select_target(&standard, &agent, &scene.context(Duration::ZERO)).expect("target");
        assert_eq!(chosen.id, EnemyId::new(2));
    }

    #[test]
    fn agents_wait_for_their_reaction_time() {
        let scene = Scene::new(
            vec![tower(0, 0, 235.0, false), tower(1, 1, 635.0, false)],
            vec![enemy(0, Vec2::new(400.0, 200.0), Behavior::Falling)],
        );
        let mut system = TowerTargeting::new(Config::new(11));
        let mut out = Vec::new();

        system.handle(scene.context(Duration::ZERO), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].tower, TowerId::new(0));
        assert_eq!(out[1].tower, TowerId::new(1));

        system.handle(scene.context(Duration::from_millis(100)), &mut out);
        assert!(out.is_empty(), "125 ms reaction time has not elapsed");

        system.handle(scene.context(Duration::from_millis(130)), &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn perfect_accuracy_hits_stationary_enemy_dead_centre() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut target = enemy(0, Vec2::new(300.0, 150.0), Behavior::Stationary);
        target.velocity = Vec2::ZERO;
        let aim = aim_point(Vec2::new(100.0, 550.0), &target, 1.0, &mut rng);
        assert!((aim - target.position).length() < 1e-3);
    }

    #[test]
    fn aim_error_stays_within_its_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut target = enemy(0, Vec2::new(300.0, 150.0), Behavior::Falling);
        target.velocity = Vec2::ZERO;
        for _ in 0..500 {
            let aim = aim_point(Vec2::new(100.0, 550.0), &target, 0.5, &mut rng);
            let offset = aim - target.position;
            assert!(offset.x.abs() <= 30.0 + 1e-3 && offset.y.abs() <= 30.0 + 1e-3);
        }
    }

    #[test]
    fn expanding_enemies_are_aimed_at_their_near_rim() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut target = enemy(0, Vec2::new(300.0, 150.0), Behavior::Expanding);
        target.radius = 50.0;
        let aim = aim_point(Vec2::new(300.0, 550.0), &target, 0.5, &mut rng);
        assert!((aim - Vec2::new(300.0, 190.0)).length() < 1e-3);
    }
}
