#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits projectile firing commands from targeting data.

use skyline_defence_core::{
    math::screen_angle, CityView, Command, Side, TowerSnapshot, TowerTarget, TowerView, Vec2,
};

const MIN_ELEVATION_DEG: f32 = -2.0;
const MAX_ELEVATION_DEG: f32 = 153.0;
const FRIENDLY_FIRE_CONE_DEG: f32 = 17.0;

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` entries for ready towers whose shot
    /// clears the firing arc and every friendly city.
    pub fn handle(
        &mut self,
        cities: &CityView,
        towers: &TowerView,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if tower_targets.is_empty() || towers.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            let Some(tower) = towers.get(target.tower) else {
                continue;
            };
            if !tower.online || !tower.ready {
                continue;
            }
            if !can_fire_at(tower, target.aim, cities) {
                log::trace!("tower {:?} holds fire at {:?}", tower.id, target.aim);
                continue;
            }
            self.scratch.push(Command::FireProjectile {
                tower: target.tower,
                aim: target.aim,
            });
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

/// Reports whether `tower` may shoot at `aim`.
///
/// The shot elevation, measured from the tower's outward horizontal, must lie
/// within the firing arc, and no other surviving city may sit inside the
/// friendly-fire cone while being closer along the same horizontal direction.
#[must_use]
pub fn can_fire_at(tower: &TowerSnapshot, aim: Vec2, cities: &CityView) -> bool {
    let shot = aim - tower.position;
    if !shot.is_finite() || shot.length_squared() == 0.0 {
        return false;
    }

    let outward = match tower.side {
        Side::Right => shot,
        Side::Left => Vec2::new(-shot.x, shot.y),
    };
    let elevation = screen_angle(outward).to_degrees();
    if !(MIN_ELEVATION_DEG..=MAX_ELEVATION_DEG).contains(&elevation) {
        return false;
    }

    let cone = FRIENDLY_FIRE_CONE_DEG.to_radians();
    !cities
        .iter()
        .filter(|city| city.is_alive() && city.id != tower.city)
        .any(|city| {
            let offset = city.position - tower.position;
            let same_direction = offset.x * shot.x > 0.0;
            let closer = offset.x.abs() < shot.x.abs();
            same_direction && closer && shot.angle_between(offset).abs() < cone
        })
}
