//! Enemy state advanced by the behaviour table.

use std::sync::Arc;

use skyline_defence_core::{Behavior, EnemyId, EnemySnapshot, Field, Gimmick, Vec2};
use skyline_defence_system_behaviour::{
    self as behaviour, BehaviorContext, Motion, DEFAULT_BOMBING_DRIFT, DEFAULT_EXPANSION_RATE,
};

pub(crate) const SPAWN_HEIGHT: f32 = -30.0;

#[derive(Clone, Debug)]
pub(crate) struct EnemyState {
    pub(crate) id: EnemyId,
    pub(crate) gimmick: Arc<Gimmick>,
    pub(crate) behavior: Behavior,
    pub(crate) motion: Motion,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) speed: f32,
    pub(crate) expansion_rate: f32,
    pub(crate) drift: f32,
    pub(crate) impact_multiplier: f32,
    pub(crate) spawn_time: f32,
    pub(crate) boss: bool,
    pub(crate) active: bool,
}

impl EnemyState {
    /// Builds an enemy from a sanitized copy of its archetype numbers.
    pub(crate) fn spawn(
        id: EnemyId,
        gimmick: Arc<Gimmick>,
        x: f32,
        boss: bool,
        now: f32,
        field: Field,
    ) -> Self {
        let sane = gimmick.as_ref().clone().sanitized();
        let radius = sane.size;
        let x = if x.is_finite() { x } else { field.width * 0.5 };
        let x = x.max(radius).min(field.width - radius);
        Self {
            id,
            behavior: sane.resolved_behavior(),
            motion: Motion {
                position: Vec2::new(x, SPAWN_HEIGHT),
                velocity: Vec2::ZERO,
                radius,
            },
            health: sane.health,
            max_health: sane.health,
            speed: sane.speed,
            expansion_rate: sane.expansion_rate.unwrap_or(DEFAULT_EXPANSION_RATE),
            drift: sane.drift.unwrap_or(DEFAULT_BOMBING_DRIFT),
            impact_multiplier: sane.impact_multiplier.unwrap_or(1.0),
            spawn_time: now,
            boss,
            active: true,
            gimmick,
        }
    }

    pub(crate) fn advance(&mut self, dt: f32, now: f32, jitter: f32, field: Field) {
        let context = BehaviorContext {
            dt,
            now,
            spawn_time: self.spawn_time,
            speed: self.speed,
            field,
            jitter,
            expansion_rate: self.expansion_rate,
            drift: self.drift,
        };
        behaviour::advance(self.behavior, &mut self.motion, &context);
    }

    pub(crate) fn is_out_of_bounds(&self, field: Field) -> bool {
        behaviour::is_out_of_bounds(self.motion.position, self.motion.radius, field)
    }

    /// Applies damage and reports whether the enemy died from it.
    pub(crate) fn take_damage(&mut self, damage: f32) -> bool {
        if !self.active {
            return false;
        }
        self.health -= damage;
        if self.health <= 0.0 {
            self.active = false;
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            position: self.motion.position,
            velocity: self.motion.velocity,
            radius: self.motion.radius,
            health: self.health,
            max_health: self.max_health,
            behavior: self.behavior,
            boss: self.boss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_sanitizes_and_clamps_inside_the_field() {
        let gimmick = Arc::new(Gimmick::new("bad", f32::NAN, -3.0, 1.0, Behavior::Falling));
        let enemy = EnemyState::spawn(
            EnemyId::new(0),
            gimmick,
            -50.0,
            false,
            0.0,
            Field::new(800.0, 600.0),
        );
        assert_eq!(enemy.speed, 0.0);
        assert_eq!(enemy.motion.radius, 4.0);
        assert_eq!(enemy.motion.position, Vec2::new(4.0, SPAWN_HEIGHT));
        assert!(enemy.health >= 1.0);
    }

    #[test]
    fn damage_kills_exactly_once() {
        let gimmick = Arc::new(Gimmick::new("rock", 20.0, 1.0, 10.0, Behavior::Falling));
        let mut enemy = EnemyState::spawn(
            EnemyId::new(0),
            gimmick,
            400.0,
            false,
            0.0,
            Field::new(800.0, 600.0),
        );
        assert!(!enemy.take_damage(10.0));
        assert!(enemy.take_damage(10.0));
        assert!(!enemy.take_damage(10.0));
        assert!(!enemy.active);
    }
}
