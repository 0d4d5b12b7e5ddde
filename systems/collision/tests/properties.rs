use proptest::prelude::*;
use skyline_defence_core::Vec2;
use skyline_defence_system_collision::{circle_circle, point_in_circle, SpatialHash};

fn coordinate() -> impl Strategy<Value = f32> {
    -1_000.0f32..1_000.0
}

proptest! {
    #[test]
    fn circle_contact_is_symmetric(
        x1 in coordinate(), y1 in coordinate(), r1 in 0.5f32..80.0,
        x2 in coordinate(), y2 in coordinate(), r2 in 0.5f32..80.0,
    ) {
        let a = Vec2::new(x1, y1);
        let b = Vec2::new(x2, y2);
        let forward = circle_circle(a, r1, b, r2);
        let backward = circle_circle(b, r2, a, r1);
        prop_assert_eq!(forward.colliding, backward.colliding);
        if a != b {
            prop_assert!((forward.normal + backward.normal).length() < 1e-4);
        }
    }

    #[test]
    fn overlap_is_never_negative(
        x1 in coordinate(), y1 in coordinate(), r1 in 0.5f32..80.0,
        x2 in coordinate(), y2 in coordinate(), r2 in 0.5f32..80.0,
    ) {
        let contact = circle_circle(Vec2::new(x1, y1), r1, Vec2::new(x2, y2), r2);
        prop_assert!(contact.overlap >= 0.0);
        prop_assert_eq!(contact.colliding, contact.overlap > 0.0);
    }

    #[test]
    fn spatial_hash_never_misses_a_true_overlap(
        points in proptest::collection::vec((coordinate(), coordinate(), 1.0f32..30.0), 1..40),
        qx in coordinate(), qy in coordinate(), qr in 1.0f32..120.0,
    ) {
        let mut grid = SpatialHash::default();
        for (index, (x, y, radius)) in points.iter().enumerate() {
            grid.insert(index as u32, Vec2::new(*x, *y), *radius);
        }
        let candidates = grid.retrieve(qx, qy, qr);
        let query = Vec2::new(qx, qy);
        for (index, (x, y, radius)) in points.iter().enumerate() {
            let center = Vec2::new(*x, *y);
            if point_in_circle(center, query, qr + radius) && point_in_circle(query, center, qr) {
                prop_assert!(candidates.contains(&(index as u32)));
            }
        }
    }
}
