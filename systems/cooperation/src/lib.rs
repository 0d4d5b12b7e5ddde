#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that runs the truck negotiation protocol between neighboring
//! cities and the cooperative super-weapon vote.
//!
//! Once per simulated second every living city reassesses its local threat.
//! Cities under pressure ask their nearest living neighbor for the shared
//! truck; the neighbor answers according to its stance and the favors it is
//! owed. The same assessment feeds the super-weapon ballot while it is armed.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use skyline_defence_core::{
    CityId, CitySnapshot, CityView, Command, EnemyView, Field, ProgressionSnapshot, Settings,
    Stance, SuperWeaponVote, TruckSnapshot, TruckView, Vec2,
};

const ASSESSMENT_INTERVAL: Duration = Duration::from_secs(1);
const RETRY_DELAY: Duration = Duration::from_secs(5);
const THREAT_RADIUS: f32 = 300.0;
const THREAT_NORMALIZER: f32 = 3.0;
const ERA_BASELINE: f32 = 0.05;
const WAVE_BASELINE: f32 = 0.005;
const WAVE_BASELINE_CAP: u32 = 20;
const UNDERDEFENDED_THRESHOLD: f32 = 0.4;
const DEFENDED_THRESHOLD: f32 = 0.7;
const REQUEST_FLOOR: f32 = 0.45;
const SKEW_THRESHOLD: f32 = 0.2;
const SKEW_WEIGHT: f32 = 0.7;
const PANIC_COUNT: usize = 8;
const PANIC_RELIEF: f32 = 0.25;

/// Snapshot of the world the cooperation pass reads.
#[derive(Clone, Copy, Debug)]
pub struct CooperationContext<'a> {
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
    /// Every active enemy.
    pub enemies: &'a EnemyView,
    /// Every shared truck.
    pub trucks: &'a TruckView,
}

/// Negotiation and vote state carried between assessments.
#[derive(Debug, Default)]
pub struct Cooperation {
    last_assessment: Option<Duration>,
    threats: BTreeMap<CityId, f32>,
    refusals: BTreeMap<(CityId, CityId), Duration>,
}

impl Cooperation {
    /// Creates a cooperation system that assesses on its first call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Threat recorded for `city` by the latest assessment.
    #[must_use]
    pub fn threat(&self, city: CityId) -> Option<f32> {
        self.threats.get(&city).copied()
    }

    /// Runs one assessment pass when a simulated second has elapsed.
    pub fn handle(&mut self, context: CooperationContext<'_>, out: &mut Vec<Command>) {
        if let Some(last) = self.last_assessment {
            if context.now.saturating_sub(last) < ASSESSMENT_INTERVAL {
                return;
            }
        }
        self.last_assessment = Some(context.now);

        self.threats = context
            .cities
            .iter()
            .filter(|city| city.is_alive())
            .map(|city| {
                let threat = assess_threat(city.position, context.enemies, context.progression);
                (city.id, threat)
            })
            .collect();
        if self.threats.is_empty() {
            return;
        }

        let threats = std::mem::take(&mut self.threats);
        self.negotiate(context.now, context.cities, context.trucks, &threats, out);

        if context.progression.super_weapon_armed {
            let panic = panic_mode(context.enemies, context.field, context.settings.difficulty);
            let votes = super_weapon_votes(context.cities, &threats, panic);
            let unanimous = !votes.is_empty() && votes.iter().all(|ballot| ballot.vote);
            out.push(Command::CastSuperWeaponVotes { votes });
            if unanimous {
                log::info!("every living city voted for the super-weapon");
                out.push(Command::FireSuperWeapon);
            }
        }
        self.threats = threats;
    }

    /// Lets every threatened city ask its nearest living neighbor for help.
    ///
    /// Requests that cannot be honored (no truck toward the neighbor, truck
    /// cooling down or already claimed in this pass) are dropped without a
    /// command. A refused requester waits before asking the same neighbor.
    pub fn negotiate(
        &mut self,
        now: Duration,
        cities: &CityView,
        trucks: &TruckView,
        threats: &BTreeMap<CityId, f32>,
        out: &mut Vec<Command>,
    ) {
        let mut claimed = BTreeSet::new();
        for requester in cities.iter().filter(|city| city.is_alive()) {
            let Some(&threat) = threats.get(&requester.id) else {
                continue;
            };
            if threat <= request_threshold(requester.active_towers) {
                continue;
            }
            let any_available = [requester.left_truck, requester.right_truck]
                .into_iter()
                .flatten()
                .any(|id| !claimed.contains(&id) && trucks.get(id).is_some_and(|t| t.available));
            if !any_available {
                continue;
            }

            let Some(neighbor) = nearest_neighbor(requester, cities) else {
                continue;
            };
            let toward = if neighbor.position.x < requester.position.x {
                requester.left_truck
            } else {
                requester.right_truck
            };
            let Some(truck) = toward.and_then(|id| trucks.get(id)) else {
                continue;
            };
            if !truck.available || claimed.contains(&truck.id) || !shares(truck, requester, neighbor)
            {
                continue;
            }
            let waiting = self
                .refusals
                .get(&(requester.id, neighbor.id))
                .is_some_and(|refused| now.saturating_sub(*refused) < RETRY_DELAY);
            if waiting {
                continue;
            }

            let neighbor_threat = threats.get(&neighbor.id).copied().unwrap_or(0.0);
            let balance = neighbor.balance_with(requester.id);
            if !neighbor_agrees(neighbor.stance, neighbor_threat, balance) {
                log::debug!(
                    "city {} refused to help city {} (threat {neighbor_threat:.2}, balance {balance})",
                    neighbor.id.get(),
                    requester.id.get()
                );
                let _ = self.refusals.insert((requester.id, neighbor.id), now);
                out.push(Command::RecordRefusal {
                    requester: requester.id,
                    neighbor: neighbor.id,
                });
                continue;
            }
            if threat <= REQUEST_FLOOR {
                continue;
            }

            let _ = claimed.insert(truck.id);
            let target_x = deployment_x(
                requester.position.x,
                threat,
                neighbor.position.x,
                neighbor_threat,
            );
            out.push(Command::DeploySharedTruck {
                truck: truck.id,
                requester: requester.id,
                helper: neighbor.id,
                target_x,
            });
        }
    }
}

/// Local threat in `0.0..=1.0` around a city at `position`.
///
/// Every enemy within range contributes its proximity factor, doubled for
/// boss-class enemies and tripled for expanding ones. The era and wave add a
/// baseline on top of the normalized sum.
#[must_use]
pub fn assess_threat(position: Vec2, enemies: &EnemyView, progression: ProgressionSnapshot) -> f32 {
    let pressure: f32 = enemies
        .iter()
        .map(|enemy| {
            let gap = enemy.position.distance(position);
            if gap.is_nan() || gap >= THREAT_RADIUS {
                return 0.0;
            }
            let mut weight = 1.0 - gap / THREAT_RADIUS;
            if enemy.is_boss_class() {
                weight *= 2.0;
            }
            if enemy.behavior.is_expanding() {
                weight *= 3.0;
            }
            weight
        })
        .sum();
    let baseline = ERA_BASELINE * progression.era.index() as f32
        + WAVE_BASELINE * progression.wave.min(WAVE_BASELINE_CAP) as f32;
    (pressure / THREAT_NORMALIZER + baseline).clamp(0.0, 1.0)
}

/// Threat a city must exceed before it asks for help.
#[must_use]
pub fn request_threshold(active_towers: u32) -> f32 {
    if active_towers < 2 {
        UNDERDEFENDED_THRESHOLD
    } else {
        DEFENDED_THRESHOLD
    }
}

/// Whether a neighbor with `stance` helps, given its own threat and the
/// balance it records toward the requester.
#[must_use]
pub fn neighbor_agrees(stance: Stance, neighbor_threat: f32, balance: i32) -> bool {
    match stance {
        Stance::Selfish => neighbor_threat > 0.7 || balance > 2,
        Stance::Cooperative => neighbor_threat > 0.3 || balance < -1,
        Stance::Neutral => neighbor_threat > 0.5,
    }
}

/// Where the defender sets up between the two cities.
///
/// The midpoint is used unless one side is strictly more than the skew
/// threshold more threatened, in which case the post leans toward it.
#[must_use]
pub fn deployment_x(
    requester_x: f32,
    requester_threat: f32,
    neighbor_x: f32,
    neighbor_threat: f32,
) -> f32 {
    let difference = requester_threat - neighbor_threat;
    if difference > SKEW_THRESHOLD {
        requester_x * SKEW_WEIGHT + neighbor_x * (1.0 - SKEW_WEIGHT)
    } else if -difference > SKEW_THRESHOLD {
        neighbor_x * SKEW_WEIGHT + requester_x * (1.0 - SKEW_WEIGHT)
    } else {
        (requester_x + neighbor_x) / 2.0
    }
}

/// Reports whether enough enemies will reach the ground soon to loosen the
/// super-weapon ballot.
#[must_use]
pub fn panic_mode(enemies: &EnemyView, field: Field, difficulty: f32) -> bool {
    let difficulty = if difficulty.is_finite() {
        difficulty.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let horizon = 10.0 - 5.0 * difficulty;
    let ground = field.ground_line();
    let incoming = enemies
        .iter()
        .filter(|enemy| {
            let descent = enemy.velocity.y;
            if descent.is_nan() || descent <= 0.0 {
                return false;
            }
            let eta = (ground - enemy.position.y).max(0.0) / descent;
            eta <= horizon
        })
        .count();
    incoming >= PANIC_COUNT
}

/// Ballots of every living city for the current pass.
#[must_use]
pub fn super_weapon_votes(
    cities: &CityView,
    threats: &BTreeMap<CityId, f32>,
    panic: bool,
) -> Vec<SuperWeaponVote> {
    let relief = if panic { PANIC_RELIEF } else { 0.0 };
    cities
        .iter()
        .filter(|city| city.is_alive())
        .map(|city| {
            let threat = threats.get(&city.id).copied().unwrap_or(0.0);
            SuperWeaponVote {
                city: city.id,
                vote: threat >= vote_threshold(city.stance) - relief,
                concern: threat * 100.0,
            }
        })
        .collect()
}

fn vote_threshold(stance: Stance) -> f32 {
    match stance {
        Stance::Cooperative => 0.5,
        Stance::Neutral => 0.6,
        Stance::Selfish => 0.75,
    }
}

/// Closest living city by horizontal distance; ties go to the lowest id.
fn nearest_neighbor<'a>(
    requester: &CitySnapshot,
    cities: &'a CityView,
) -> Option<&'a CitySnapshot> {
    cities
        .iter()
        .filter(|city| city.is_alive() && city.id != requester.id)
        .fold(None, |best: Option<&CitySnapshot>, city| {
            let gap = (city.position.x - requester.position.x).abs();
            match best {
                Some(current) if (current.position.x - requester.position.x).abs() <= gap => {
                    Some(current)
                }
                _ => Some(city),
            }
        })
}

fn shares(truck: &TruckSnapshot, first: &CitySnapshot, second: &CitySnapshot) -> bool {
    (truck.city_a == first.id && truck.city_b == second.id)
        || (truck.city_a == second.id && truck.city_b == first.id)
}
