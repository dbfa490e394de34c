use crate::goal_watcher::GoalWatcher;
use common::goal::GoalSpec;

/// S6 — a distance goal fires exactly once, even as distance keeps growing
/// past the threshold on later updates.
#[test]
fn s6_goal_reached_fires_exactly_once() {
    let mut watcher = GoalWatcher::new(GoalSpec::Distance(3_000));

    assert!(watcher.check(2_999.0, 890_000, 200_000).is_none());

    let reached = watcher.check(3_000.0, 900_000, 200_000);
    assert!(reached.is_some());
    let reached = reached.unwrap();
    assert_eq!(reached.elapsed_ms, 900_000);
    assert_eq!(reached.distance_m, 3_000.0);

    assert!(watcher.check(3_500.0, 950_000, 200_000).is_none());
    assert!(watcher.reached());
}

#[test]
fn time_goal_trips_on_elapsed_threshold() {
    let mut watcher = GoalWatcher::new(GoalSpec::Time(600_000));
    assert!(watcher.check(1_000.0, 599_999, 100_000).is_none());
    assert!(watcher.check(1_200.0, 600_000, 100_000).is_some());
}

#[test]
fn none_goal_never_trips() {
    let mut watcher = GoalWatcher::new(GoalSpec::None);
    assert!(watcher.check(1_000_000.0, 1_000_000, 1).is_none());
    assert!(!watcher.reached());
}
