//! Geometry helpers shared by every system.
//!
//! All helpers operate on [`Vec2`] values and never mutate their inputs.

pub use glam::Vec2;

/// Speed of every tower projectile measured in world units per second.
pub const PROJECTILE_SPEED: f32 = 250.0;

const DEGENERATE_EPSILON: f32 = 1e-6;

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Returns the unit vector pointing from `from` toward `to`, or zero when the
/// points coincide.
#[must_use]
pub fn direction(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// Replaces non-finite components with zero so they cannot poison position math.
#[must_use]
pub fn finite_or_zero(value: Vec2) -> Vec2 {
    Vec2::new(finite_scalar(value.x), finite_scalar(value.y))
}

/// Replaces a non-finite scalar with zero.
#[must_use]
pub fn finite_scalar(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Angle of `vector` in radians, measured counter-clockwise from the positive x
/// axis with y pointing *up* on screen.
///
/// World coordinates grow downward, so the y component is negated.
#[must_use]
pub fn screen_angle(vector: Vec2) -> f32 {
    (-vector.y).atan2(vector.x)
}

/// Smallest signed difference `to - from` between two angles, wrapped to
/// `(-PI, PI]`.
#[must_use]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let mut delta = (to - from) % std::f32::consts::TAU;
    if delta > std::f32::consts::PI {
        delta -= std::f32::consts::TAU;
    } else if delta <= -std::f32::consts::PI {
        delta += std::f32::consts::TAU;
    }
    delta
}

/// Solves for the earliest time a projectile launched from `shooter` at
/// `speed` meets a target moving linearly from `target` with `velocity`.
///
/// Returns `None` when no positive solution exists.
#[must_use]
pub fn intercept_time(shooter: Vec2, target: Vec2, velocity: Vec2, speed: f32) -> Option<f32> {
    let relative = target - shooter;
    let a = velocity.dot(velocity) - speed * speed;
    let b = 2.0 * relative.dot(velocity);
    let c = relative.dot(relative);

    if a.abs() < DEGENERATE_EPSILON {
        if b.abs() < DEGENERATE_EPSILON {
            return None;
        }
        let t = -c / b;
        return (t > 0.0).then_some(t);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);

    match (t1 > 0.0, t2 > 0.0) {
        (true, true) => Some(t1.min(t2)),
        (true, false) => Some(t1),
        (false, true) => Some(t2),
        (false, false) => None,
    }
}

/// Simple linear lead: the target position advanced by the time a projectile
/// needs to cover the current distance.
#[must_use]
pub fn linear_lead(shooter: Vec2, target: Vec2, velocity: Vec2, speed: f32) -> Vec2 {
    if speed <= 0.0 {
        return target;
    }
    let travel = distance(shooter, target) / speed;
    target + velocity * travel
}

/// Exact linear interception point, falling back to [`linear_lead`] when the
/// quadratic has no usable root.
#[must_use]
pub fn intercept_point(shooter: Vec2, target: Vec2, velocity: Vec2, speed: f32) -> Vec2 {
    match intercept_time(shooter, target, velocity, speed) {
        Some(t) => target + velocity * t,
        None => linear_lead(shooter, target, velocity, speed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_target_is_hit_where_it_stands() {
        let shooter = Vec2::new(100.0, 500.0);
        let target = Vec2::new(300.0, 120.0);
        let aim = intercept_point(shooter, target, Vec2::ZERO, PROJECTILE_SPEED);
        assert!((aim - target).length() < 1e-3, "aim {aim:?}");
    }

    #[test]
    fn coincident_target_falls_back_to_position() {
        let point = Vec2::new(10.0, 10.0);
        let aim = intercept_point(point, point, Vec2::ZERO, PROJECTILE_SPEED);
        assert_eq!(aim, point);
    }

    #[test]
    fn moving_target_meets_projectile_at_predicted_time() {
        let shooter = Vec2::new(0.0, 0.0);
        let target = Vec2::new(200.0, -300.0);
        let velocity = Vec2::new(0.0, 60.0);
        let t = intercept_time(shooter, target, velocity, PROJECTILE_SPEED).expect("solution");
        let meet = target + velocity * t;
        let flight = meet.length() / PROJECTILE_SPEED;
        assert!((flight - t).abs() < 1e-3);
    }

    #[test]
    fn target_faster_than_projectile_running_away_has_no_solution() {
        let shooter = Vec2::ZERO;
        let target = Vec2::new(100.0, 0.0);
        let velocity = Vec2::new(400.0, 0.0);
        assert!(intercept_time(shooter, target, velocity, PROJECTILE_SPEED).is_none());
        let aim = intercept_point(shooter, target, velocity, PROJECTILE_SPEED);
        assert_eq!(aim, linear_lead(shooter, target, velocity, PROJECTILE_SPEED));
    }

    #[test]
    fn angle_delta_wraps_across_pi() {
        let delta = angle_delta(3.0, -3.0);
        assert!((delta - (std::f32::consts::TAU - 6.0)).abs() < 1e-5);
    }

    #[test]
    fn screen_angle_points_up_for_negative_y() {
        let angle = screen_angle(Vec2::new(0.0, -1.0));
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
