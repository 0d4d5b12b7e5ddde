#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure per-archetype movement functions for enemies.
//!
//! Every [`Behavior`] maps to one update function through a fixed dispatch
//! table. Functions never touch randomness themselves; the caller supplies a
//! per-frame jitter sample in [`BehaviorContext`] so replays stay
//! deterministic.

use skyline_defence_core::{Behavior, Field, Vec2, PIXELS_PER_SPEED_UNIT};

/// Base fall speed floor for stationary and expanding archetypes, in pixels
/// per second.
pub const MIN_FALL_SPEED: f32 = 20.0;

/// Default radius growth of expanding archetypes, in pixels per second.
pub const DEFAULT_EXPANSION_RATE: f32 = 5.0;

/// Default horizontal drift of bombing archetypes, in pixels per second.
pub const DEFAULT_BOMBING_DRIFT: f32 = 40.0;

/// Margin above the playfield where freshly spawned enemies are still in bounds.
pub const SPAWN_MARGIN: f32 = 100.0;

/// Mutable kinematic state advanced by a behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// Center of the enemy.
    pub position: Vec2,
    /// Velocity derived from the most recent displacement.
    pub velocity: Vec2,
    /// Collision radius.
    pub radius: f32,
}

/// Read-only inputs to a behavior update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BehaviorContext {
    /// Elapsed time of this update in seconds.
    pub dt: f32,
    /// Simulation clock in seconds.
    pub now: f32,
    /// Simulation time at which the enemy spawned; used as phase offset.
    pub spawn_time: f32,
    /// Configured speed in archetype units.
    pub speed: f32,
    /// Playfield dimensions.
    pub field: Field,
    /// Frame-local random sample in `-1.0..=1.0`.
    pub jitter: f32,
    /// Radius growth for expanding archetypes.
    pub expansion_rate: f32,
    /// Horizontal drift for bombing archetypes.
    pub drift: f32,
}

impl BehaviorContext {
    fn fall_speed(&self) -> f32 {
        self.speed * PIXELS_PER_SPEED_UNIT
    }

    fn phase(&self, frequency: f32) -> f32 {
        self.now * frequency + self.spawn_time
    }
}

type UpdateFn = fn(&mut Motion, &BehaviorContext);

const DISPATCH: [(Behavior, UpdateFn); 14] = [
    (Behavior::Falling, falling),
    (Behavior::Ballistic, ballistic),
    (Behavior::Fast, fast),
    (Behavior::FastFalling, fast_falling),
    (Behavior::Tumbling, tumbling),
    (Behavior::Bombing, bombing),
    (Behavior::Stationary, stationary),
    (Behavior::IntelligentDodging, intelligent_dodging),
    (Behavior::IntelligentEvasion, intelligent_evasion),
    (Behavior::Erratic, erratic),
    (Behavior::CoordinatedAttack, coordinated_attack),
    (Behavior::Homing, homing),
    (Behavior::SlowAdvance, slow_advance),
    (Behavior::Expanding, expanding),
];

/// Advances `motion` by one update of `behavior`.
///
/// Non-positive or non-finite `dt` leaves the motion untouched.
pub fn advance(behavior: Behavior, motion: &mut Motion, context: &BehaviorContext) {
    if !(context.dt.is_finite() && context.dt > 0.0) {
        return;
    }
    let update = DISPATCH
        .iter()
        .find(|(candidate, _)| *candidate == behavior)
        .map_or(falling as UpdateFn, |(_, update)| *update);
    update(motion, context);
}

/// Reports whether an enemy has left the playfield.
///
/// The area above the top edge is in bounds up to [`SPAWN_MARGIN`] so enemies
/// may spawn off-screen.
#[must_use]
pub fn is_out_of_bounds(position: Vec2, radius: f32, field: Field) -> bool {
    position.x < -radius
        || position.x > field.width + radius
        || position.y < -SPAWN_MARGIN - radius
        || position.y > field.height + radius
}

fn displace(motion: &mut Motion, displacement: Vec2, dt: f32) {
    let displacement = skyline_defence_core::math::finite_or_zero(displacement);
    motion.position += displacement;
    motion.velocity = displacement / dt;
}

fn clamp_to_field(motion: &mut Motion, field: Field) {
    let low = motion.radius;
    let high = field.width - motion.radius;
    motion.position.x = motion.position.x.max(low).min(high);
}

fn fall_scaled(motion: &mut Motion, context: &BehaviorContext, factor: f32) {
    let dy = context.fall_speed() * factor * context.dt;
    displace(motion, Vec2::new(0.0, dy), context.dt);
}

fn weave(
    motion: &mut Motion,
    context: &BehaviorContext,
    amplitude: f32,
    phase: f32,
    extra: f32,
) {
    let dx = (phase.sin() * amplitude + extra) * context.dt;
    let dy = context.fall_speed() * context.dt;
    displace(motion, Vec2::new(dx, dy), context.dt);
    clamp_to_field(motion, context.field);
}

fn falling(motion: &mut Motion, context: &BehaviorContext) {
    fall_scaled(motion, context, 1.0);
}

fn ballistic(motion: &mut Motion, context: &BehaviorContext) {
    let dx = context.phase(2.0).sin() * 40.0 * context.dt;
    let dy = context.fall_speed() * context.dt;
    displace(motion, Vec2::new(dx, dy), context.dt);
}

fn fast(motion: &mut Motion, context: &BehaviorContext) {
    fall_scaled(motion, context, 1.5);
}

fn fast_falling(motion: &mut Motion, context: &BehaviorContext) {
    fall_scaled(motion, context, 1.3);
}

fn tumbling(motion: &mut Motion, context: &BehaviorContext) {
    let dx = context.phase(3.5).sin() * 25.0 * context.dt;
    let dy = context.fall_speed() * context.dt;
    displace(motion, Vec2::new(dx, dy), context.dt);
}

fn bombing(motion: &mut Motion, context: &BehaviorContext) {
    let dx = context.jitter * context.drift * context.dt;
    let dy = context.fall_speed() * 0.6 * context.dt;
    displace(motion, Vec2::new(dx, dy), context.dt);
    clamp_to_field(motion, context.field);
}

fn stationary(motion: &mut Motion, context: &BehaviorContext) {
    let dy = context.fall_speed().max(MIN_FALL_SPEED) * context.dt;
    displace(motion, Vec2::new(0.0, dy), context.dt);
}

fn intelligent_dodging(motion: &mut Motion, context: &BehaviorContext) {
    weave(motion, context, 80.0, context.phase(3.0), 0.0);
}

fn intelligent_evasion(motion: &mut Motion, context: &BehaviorContext) {
    let phase = motion.position.y * 0.02 * 2.2 + context.spawn_time;
    weave(motion, context, 110.0, phase, 0.0);
}

fn erratic(motion: &mut Motion, context: &BehaviorContext) {
    weave(motion, context, 60.0, context.phase(5.0), context.jitter * 30.0);
}

fn coordinated_attack(motion: &mut Motion, context: &BehaviorContext) {
    // Shared clock only, so every attacker in the wave sways in unison.
    let phase = context.now * 1.5;
    weave(motion, context, 50.0, phase, 0.0);
}

fn homing(motion: &mut Motion, context: &BehaviorContext) {
    let target = Vec2::new(context.field.width * 0.5, context.field.height);
    let heading = (target - motion.position).normalize_or_zero();
    displace(motion, heading * context.fall_speed() * context.dt, context.dt);
}

fn slow_advance(motion: &mut Motion, context: &BehaviorContext) {
    fall_scaled(motion, context, 0.5);
}

fn expanding(motion: &mut Motion, context: &BehaviorContext) {
    let dy = context.fall_speed().max(MIN_FALL_SPEED) * 0.3 * context.dt;
    displace(motion, Vec2::new(0.0, dy), context.dt);
    motion.radius += context.expansion_rate * context.dt;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(speed: f32) -> BehaviorContext {
        BehaviorContext {
            dt: 0.5,
            now: 10.0,
            spawn_time: 3.0,
            speed,
            field: Field::new(800.0, 600.0),
            jitter: 0.0,
            expansion_rate: DEFAULT_EXPANSION_RATE,
            drift: DEFAULT_BOMBING_DRIFT,
        }
    }

    fn motion_at(x: f32, y: f32) -> Motion {
        Motion {
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            radius: 10.0,
        }
    }

    #[test]
    fn falling_moves_straight_down_at_scaled_speed() {
        let mut motion = motion_at(400.0, 0.0);
        advance(Behavior::Falling, &mut motion, &context(2.0));
        assert_eq!(motion.position, Vec2::new(400.0, 30.0));
        assert_eq!(motion.velocity, Vec2::new(0.0, 60.0));
    }

    #[test]
    fn speed_multipliers_scale_descent() {
        let cases = [
            (Behavior::Fast, 1.5),
            (Behavior::FastFalling, 1.3),
            (Behavior::SlowAdvance, 0.5),
            (Behavior::Expanding, 0.3),
        ];
        for (behavior, factor) in cases {
            let mut motion = motion_at(400.0, 0.0);
            advance(behavior, &mut motion, &context(2.0));
            let expected = 60.0 * factor * 0.5;
            assert!(
                (motion.position.y - expected).abs() < 1e-4,
                "{behavior:?} moved {}",
                motion.position.y
            );
        }
    }

    #[test]
    fn stationary_never_stalls() {
        let mut motion = motion_at(400.0, -50.0);
        advance(Behavior::Stationary, &mut motion, &context(0.0));
        assert!((motion.position.y - (-40.0)).abs() < 1e-4);
    }

    #[test]
    fn motionless_expanding_archetypes_still_descend() {
        let mut motion = motion_at(400.0, 0.0);
        let mut ctx = context(0.0);
        ctx.dt = 1.0;
        advance(Behavior::Expanding, &mut motion, &ctx);
        assert!((motion.position.y - 6.0).abs() < 1e-4);

        let ground = ctx.field.ground_line();
        let seconds = (0..120)
            .position(|_| {
                advance(Behavior::Expanding, &mut motion, &ctx);
                motion.position.y >= ground
            })
            .expect("reaches the ground");
        assert!(seconds < 100, "took {seconds} s");
    }

    #[test]
    fn expanding_grows_radius() {
        let mut motion = motion_at(400.0, 0.0);
        advance(Behavior::Expanding, &mut motion, &context(1.0));
        assert!((motion.radius - 12.5).abs() < 1e-4);
    }

    #[test]
    fn weaving_is_clamped_to_the_field() {
        let mut motion = motion_at(1.0, 100.0);
        let mut ctx = context(1.0);
        ctx.jitter = -1.0;
        for _ in 0..40 {
            advance(Behavior::Erratic, &mut motion, &ctx);
            ctx.now += ctx.dt;
            assert!(motion.position.x >= motion.radius);
            assert!(motion.position.x <= 800.0 - motion.radius);
        }
    }

    #[test]
    fn homing_heads_for_bottom_center() {
        let mut motion = motion_at(0.0, 0.0);
        advance(Behavior::Homing, &mut motion, &context(1.0));
        assert!(motion.velocity.x > 0.0);
        assert!(motion.velocity.y > 0.0);
        assert!((motion.velocity.length() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn zero_dt_is_ignored() {
        let mut motion = motion_at(400.0, 0.0);
        let mut ctx = context(2.0);
        ctx.dt = 0.0;
        advance(Behavior::Falling, &mut motion, &ctx);
        assert_eq!(motion, motion_at(400.0, 0.0));
    }

    #[test]
    fn spawn_margin_keeps_fresh_enemies_in_bounds() {
        let field = Field::new(800.0, 600.0);
        assert!(!is_out_of_bounds(Vec2::new(400.0, -30.0), 10.0, field));
        assert!(!is_out_of_bounds(Vec2::new(400.0, -105.0), 10.0, field));
        assert!(is_out_of_bounds(Vec2::new(400.0, -111.0), 10.0, field));
        assert!(is_out_of_bounds(Vec2::new(811.0, 300.0), 10.0, field));
        assert!(is_out_of_bounds(Vec2::new(400.0, 611.0), 10.0, field));
    }

    #[test]
    fn every_behavior_has_an_update_function() {
        for (behavior, _) in DISPATCH {
            let mut motion = motion_at(400.0, 100.0);
            advance(behavior, &mut motion, &context(1.0));
            assert!(motion.position.y > 100.0, "{behavior:?} did not descend");
        }
    }
}
