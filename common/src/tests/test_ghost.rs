use crate::ghost::{GhostPoint, GhostTarget};

fn target() -> GhostTarget {
    GhostTarget {
        id: "target-1".into(),
        points: vec![
            GhostPoint {
                cumulative_distance_m: 0.0,
                elapsed_ms: 0,
            },
            GhostPoint {
                cumulative_distance_m: 1_000.0,
                elapsed_ms: 300_000,
            },
            GhostPoint {
                cumulative_distance_m: 2_000.0,
                elapsed_ms: 620_000,
            },
        ],
    }
}

#[test]
fn interpolates_between_control_points() {
    let t = target();
    assert_eq!(t.elapsed_at_distance(500.0), Some(150_000));
}

#[test]
fn exact_control_point_returns_its_own_value() {
    let t = target();
    assert_eq!(t.elapsed_at_distance(1_000.0), Some(300_000));
}

#[test]
fn clamps_below_first_point() {
    let t = target();
    assert_eq!(t.elapsed_at_distance(-5.0), Some(0));
}

#[test]
fn clamps_above_last_point() {
    let t = target();
    assert_eq!(t.elapsed_at_distance(5_000.0), Some(620_000));
}

#[test]
fn empty_target_has_no_interpolation() {
    let t = GhostTarget {
        id: "empty".into(),
        points: vec![],
    };
    assert_eq!(t.elapsed_at_distance(100.0), None);
    assert_eq!(t.max_distance_m(), 0.0);
}
