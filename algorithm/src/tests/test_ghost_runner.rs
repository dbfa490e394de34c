use crate::ghost_runner::{select_target, GhostDelta, GhostRunner};
use common::ghost::{GhostPoint, GhostTarget};
use std::sync::Arc;

fn target(id: &str, points: Vec<(f64, i64)>) -> GhostTarget {
    GhostTarget {
        id: id.to_string(),
        points: points
            .into_iter()
            .map(|(cumulative_distance_m, elapsed_ms)| GhostPoint {
                cumulative_distance_m,
                elapsed_ms,
            })
            .collect(),
    }
}

/// S5 — reaching 1 km five seconds ahead of the ghost's interpolated pace.
#[test]
fn s5_ghost_delta_at_first_kilometre() {
    let t = target("t1", vec![(0.0, 0), (1_000.0, 300_000), (2_000.0, 620_000)]);
    let mut runner = GhostRunner::new(Arc::new(t));

    let deltas = runner.on_distance_update(1_000.0, 295_000);
    assert_eq!(
        deltas,
        vec![GhostDelta {
            km: 1,
            diff_seconds: -5
        }]
    );
}

#[test]
fn finish_reports_success_only_when_goal_completed_and_ahead() {
    let t = target("t1", vec![(0.0, 0), (1_000.0, 300_000)]);
    let mut runner = GhostRunner::new(Arc::new(t));
    runner.on_distance_update(1_000.0, 290_000);

    let result = runner.finish(1_000.0, 290_000);
    assert!(!result.success, "goal was never marked completed");

    runner.mark_goal_completed();
    let result = runner.finish(1_000.0, 290_000);
    assert!(result.success);
    assert_eq!(result.diff_seconds, -10);
}

#[test]
fn select_target_prefers_closest_distance_within_range() {
    let candidates = vec![
        target("near", vec![(0.0, 0), (1_000.0, 300_000)]),
        target("empty", vec![]),
        target("far", vec![(0.0, 0), (5_000.0, 900_000)]),
    ];

    let chosen = select_target(&candidates, Some(1_200.0)).unwrap();
    assert_eq!(chosen.id, "near");
}

#[test]
fn select_target_falls_back_to_shortest_duration() {
    let candidates = vec![
        target("near", vec![(0.0, 0), (1_000.0, 300_000)]),
        target("far", vec![(0.0, 0), (5_000.0, 900_000)]),
    ];

    let chosen = select_target(&candidates, None).unwrap();
    assert_eq!(chosen.id, "near");
}

#[test]
fn select_target_ignores_ineligible_empty_targets() {
    let candidates = vec![target("empty", vec![])];
    assert!(select_target(&candidates, None).is_none());
    assert!(select_target(&[], None).is_none());
}
