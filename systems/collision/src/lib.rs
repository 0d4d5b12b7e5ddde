#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shape intersection tests and a broad-phase spatial hash.
//!
//! The narrow-phase functions are pure and allocation free. The
//! [`SpatialHash`] is purely advisory: callers always confirm candidates with
//! a narrow-phase test, so an empty or stale grid only costs time.

use std::collections::{BTreeSet, HashMap};

use skyline_defence_core::Vec2;

/// Default edge length of a spatial hash cell in world units.
pub const DEFAULT_CELL_SIZE: f32 = 50.0;

const PARALLEL_EPSILON: f32 = 1e-10;

/// Outcome of a circle-versus-circle test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Whether the shapes strictly overlap.
    pub colliding: bool,
    /// Penetration depth; zero when not colliding.
    pub overlap: f32,
    /// Unit vector pointing from the first circle toward the second.
    pub normal: Vec2,
}

/// Tests two circles for strict overlap.
///
/// Circles whose centers are exactly `r1 + r2` apart merely touch and are not
/// reported as colliding. Coincident centers yield a `+x` normal.
#[must_use]
pub fn circle_circle(c1: Vec2, r1: f32, c2: Vec2, r2: f32) -> Contact {
    let delta = c2 - c1;
    let distance = delta.length();
    let reach = r1 + r2;
    let normal = if distance > 0.0 {
        delta / distance
    } else {
        Vec2::X
    };

    if distance < reach {
        Contact {
            colliding: true,
            overlap: reach - distance,
            normal,
        }
    } else {
        Contact {
            colliding: false,
            overlap: 0.0,
            normal,
        }
    }
}

/// Reports whether `point` lies strictly inside the circle.
#[must_use]
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) < radius * radius
}

/// Axis-aligned rectangle described by its top-left corner and size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Creates a rectangle centered on `center`.
    #[must_use]
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            origin: center - size * 0.5,
            size,
        }
    }

    /// Bottom-right corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }
}

/// Reports whether `point` lies inside the rectangle, edges included.
#[must_use]
pub fn point_in_rect(point: Vec2, rect: Rect) -> bool {
    let max = rect.max();
    point.x >= rect.origin.x && point.x <= max.x && point.y >= rect.origin.y && point.y <= max.y
}

/// Tests a circle against a rectangle using the rectangle point closest to the
/// circle center.
#[must_use]
pub fn circle_rect(center: Vec2, radius: f32, rect: Rect) -> bool {
    let closest = center.clamp(rect.origin, rect.max());
    point_in_circle(closest, center, radius)
}

/// Closest point to `point` on the segment `start..end`.
#[must_use]
pub fn closest_point_on_segment(point: Vec2, start: Vec2, end: Vec2) -> Vec2 {
    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq <= f32::EPSILON {
        return start;
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    start + segment * t
}

/// Tests a circle against the segment `start..end`.
#[must_use]
pub fn circle_segment(center: Vec2, radius: f32, start: Vec2, end: Vec2) -> bool {
    let closest = closest_point_on_segment(center, start, end);
    point_in_circle(closest, center, radius)
}

/// Intersection point of segments `a1..a2` and `b1..b2`.
///
/// Returns `None` for near-parallel segments (|det| < 1e-10) or when the
/// crossing lies outside either segment.
#[must_use]
pub fn segment_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let r = a2 - a1;
    let s = b2 - b1;
    let determinant = r.perp_dot(s);
    if determinant.abs() < PARALLEL_EPSILON {
        return None;
    }

    let offset = b1 - a1;
    let t = offset.perp_dot(s) / determinant;
    let u = offset.perp_dot(r) / determinant;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1 + r * t)
    } else {
        None
    }
}

/// Uniform grid bucketing entity identifiers by the cells their discs cover.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cell_size: f32,
    origin: Vec2,
    cells: HashMap<(i32, i32), Vec<u32>>,
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE, Vec2::ZERO)
    }
}

impl SpatialHash {
    /// Creates an empty grid. Non-positive cell sizes fall back to the default.
    #[must_use]
    pub fn new(cell_size: f32, origin: Vec2) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            origin,
            cells: HashMap::new(),
        }
    }

    /// Edge length of each cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Removes every entry while keeping allocated buckets.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    /// Cell key containing `point`.
    #[must_use]
    pub fn cell_key(&self, point: Vec2) -> (i32, i32) {
        let local = (point - self.origin) / self.cell_size;
        (local.x.floor() as i32, local.y.floor() as i32)
    }

    /// Buckets `id` into every cell covered by the disc.
    pub fn insert(&mut self, id: u32, position: Vec2, radius: f32) {
        let (min, max) = self.cell_range(position, radius);
        for column in min.0..=max.0 {
            for row in min.1..=max.1 {
                self.cells.entry((column, row)).or_default().push(id);
            }
        }
    }

    /// Union of identifiers found in the cells covered by the query disc,
    /// in ascending order.
    #[must_use]
    pub fn retrieve(&self, x: f32, y: f32, radius: f32) -> Vec<u32> {
        let (min, max) = self.cell_range(Vec2::new(x, y), radius);
        let mut found = BTreeSet::new();
        for column in min.0..=max.0 {
            for row in min.1..=max.1 {
                if let Some(bucket) = self.cells.get(&(column, row)) {
                    found.extend(bucket.iter().copied());
                }
            }
        }
        found.into_iter().collect()
    }

    fn cell_range(&self, position: Vec2, radius: f32) -> ((i32, i32), (i32, i32)) {
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let min = self.cell_key(position - Vec2::splat(radius));
        let max = self.cell_key(position + Vec2::splat(radius));
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_circles_do_not_collide() {
        let contact = circle_circle(Vec2::new(0.0, 0.0), 10.0, Vec2::new(30.0, 0.0), 20.0);
        assert!(!contact.colliding);
        assert_eq!(contact.overlap, 0.0);
    }

    #[test]
    fn overlapping_circles_report_normal_toward_second() {
        let contact = circle_circle(Vec2::new(0.0, 0.0), 10.0, Vec2::new(29.0, 0.0), 20.0);
        assert!(contact.colliding);
        assert!((contact.overlap - 1.0).abs() < 1e-5);
        assert_eq!(contact.normal, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn coincident_centers_still_collide() {
        let contact = circle_circle(Vec2::ONE, 1.0, Vec2::ONE, 1.0);
        assert!(contact.colliding);
        assert_eq!(contact.normal, Vec2::X);
    }

    #[test]
    fn rect_tests_use_closest_point() {
        let rect = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(point_in_rect(Vec2::new(10.0, 5.0), rect));
        assert!(!point_in_rect(Vec2::new(10.1, 5.0), rect));
        assert!(circle_rect(Vec2::new(14.0, 5.0), 5.0, rect));
        assert!(!circle_rect(Vec2::new(15.0, 15.0), 5.0, rect));
    }

    #[test]
    fn segment_test_catches_grazing_circle() {
        let start = Vec2::new(0.0, 0.0);
        let end = Vec2::new(100.0, 0.0);
        assert!(circle_segment(Vec2::new(50.0, 4.0), 5.0, start, end));
        assert!(!circle_segment(Vec2::new(50.0, 6.0), 5.0, start, end));
        assert!(circle_segment(Vec2::new(103.0, 0.0), 5.0, start, end));
    }

    #[test]
    fn crossing_segments_intersect() {
        let hit = segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 0.0),
        )
        .expect("intersection");
        assert!((hit - Vec2::new(5.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(10.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn disjoint_segments_do_not_intersect() {
        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(6.0, -10.0),
        )
        .is_none());
    }

    #[test]
    fn cell_keys_floor_relative_to_origin() {
        let grid = SpatialHash::new(50.0, Vec2::new(-100.0, -100.0));
        assert_eq!(grid.cell_key(Vec2::new(-100.0, -100.0)), (0, 0));
        assert_eq!(grid.cell_key(Vec2::new(-101.0, 49.0)), (-1, 2));
    }

    #[test]
    fn retrieve_unions_covered_cells() {
        let mut grid = SpatialHash::default();
        grid.insert(1, Vec2::new(10.0, 10.0), 5.0);
        grid.insert(2, Vec2::new(60.0, 10.0), 5.0);
        grid.insert(3, Vec2::new(400.0, 400.0), 5.0);
        assert_eq!(grid.retrieve(40.0, 10.0, 20.0), vec![1, 2]);
        assert_eq!(grid.retrieve(10.0, 10.0, 1.0), vec![1]);
        grid.clear();
        assert!(grid.retrieve(10.0, 10.0, 500.0).is_empty());
    }

    #[test]
    fn invalid_cell_size_falls_back_to_default() {
        assert_eq!(SpatialHash::new(0.0, Vec2::ZERO).cell_size(), DEFAULT_CELL_SIZE);
        assert_eq!(SpatialHash::new(f32::NAN, Vec2::ZERO).cell_size(), DEFAULT_CELL_SIZE);
    }
}
