//! Flank railguns: charge, track the lowest enemy, fire piercing bolts.

use skyline_defence_core::{
    math::{angle_delta, screen_angle},
    CityId, EnemyId, RailgunId, RailgunSnapshot, Side, Vec2,
};

use crate::enemies::EnemyState;

pub(crate) const RAILGUN_MAX_HEALTH: f32 = 150.0;
pub(crate) const RAILGUN_OFFSET: f32 = 55.0;
pub(crate) const RAILGUN_GROUND_OFFSET: f32 = 45.0;
pub(crate) const RAILGUN_DAMAGE: f32 = 250.0;
const FIRE_INTERVAL: f32 = 5.0;
const RANGE: f32 = 1_500.0;
const TURN_RATE: f32 = 3.0;
const ALIGNMENT_TOLERANCE: f32 = 0.05;

#[derive(Clone, Debug)]
pub(crate) struct RailgunState {
    pub(crate) id: RailgunId,
    pub(crate) city: CityId,
    pub(crate) side: Side,
    pub(crate) position: Vec2,
    pub(crate) health: f32,
    pub(crate) aim_angle: f32,
    pub(crate) charge: f32,
    pub(crate) target: Option<EnemyId>,
    pub(crate) destroyed: bool,
}

impl RailgunState {
    pub(crate) fn new(id: RailgunId, city: CityId, side: Side, position: Vec2) -> Self {
        Self {
            id,
            city,
            side,
            position,
            health: RAILGUN_MAX_HEALTH,
            aim_angle: std::f32::consts::FRAC_PI_2,
            charge: 0.0,
            target: None,
            destroyed: false,
        }
    }

    /// Applies damage and reports whether this call destroyed the railgun.
    pub(crate) fn take_damage(&mut self, damage: f32) -> bool {
        if self.destroyed {
            return false;
        }
        self.health = (self.health - damage).max(0.0);
        if self.health <= 0.0 {
            self.destroyed = true;
            return true;
        }
        false
    }

    /// Charges, tracks, and returns the firing angle when a shot is released.
    pub(crate) fn update(&mut self, dt: f32, enemies: &[EnemyState]) -> Option<f32> {
        if self.destroyed {
            return None;
        }
        self.charge = (self.charge + dt / FIRE_INTERVAL).min(1.0);

        let target = select_target(self.position, enemies);
        self.target = target.map(|enemy| enemy.id);
        let enemy = target?;

        let desired = screen_angle(enemy.motion.position - self.position);
        let delta = angle_delta(self.aim_angle, desired);
        let turn = TURN_RATE * dt;
        self.aim_angle = if delta.abs() <= turn {
            desired
        } else {
            self.aim_angle + turn.copysign(delta)
        };

        let aligned = angle_delta(self.aim_angle, desired).abs() <= ALIGNMENT_TOLERANCE;
        if self.charge >= 1.0 && aligned {
            self.charge = 0.0;
            return Some(self.aim_angle);
        }
        None
    }

    pub(crate) fn snapshot(&self) -> RailgunSnapshot {
        RailgunSnapshot {
            id: self.id,
            city: self.city,
            side: self.side,
            position: self.position,
            health: self.health,
            max_health: RAILGUN_MAX_HEALTH,
            aim_angle: self.aim_angle,
            charge: self.charge,
            target: self.target,
        }
    }
}

/// In-range enemy closest to the ground; ties go to the lowest identifier.
fn select_target(origin: Vec2, enemies: &[EnemyState]) -> Option<&EnemyState> {
    enemies
        .iter()
        .filter(|enemy| enemy.active && enemy.motion.position.distance(origin) <= RANGE)
        .fold(None, |best: Option<&EnemyState>, enemy| match best {
            Some(current)
                if current.motion.position.y > enemy.motion.position.y
                    || (current.motion.position.y == enemy.motion.position.y
                        && current.id < enemy.id) =>
            {
                Some(current)
            }
            _ => Some(enemy),
        })
}
