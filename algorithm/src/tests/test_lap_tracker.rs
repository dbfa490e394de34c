use crate::lap_tracker::LapTracker;

/// S3 — 1250 m covered incrementally over 250 s at 500 m laps yields exactly
/// two completed laps, each ~500 m.
#[test]
fn s3_lap_emission_over_incremental_segments() {
    let mut tracker = LapTracker::new(500.0);
    let mut emitted = Vec::new();
    for i in 1..=25i64 {
        let distance_m = i as f64 * 50.0;
        let elapsed_ms = i * 10_000;
        emitted.extend(tracker.on_distance_update(distance_m, elapsed_ms));
    }

    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0].index, 1);
    assert_eq!(emitted[1].index, 2);
    assert!((emitted[0].distance_m - 500.0).abs() < 1e-6);
    assert!((emitted[1].distance_m - 500.0).abs() < 1e-6);
    assert!(emitted[1].elapsed_ms > emitted[0].elapsed_ms);
}

/// A single large jump must still emit one lap per boundary crossed so
/// `laps.len() == floor(distance_m / lap_distance_m)` holds exactly.
#[test]
fn large_jump_emits_one_lap_per_boundary_crossed() {
    let mut tracker = LapTracker::new(500.0);
    let emitted = tracker.on_distance_update(1700.0, 500_000);

    assert_eq!(emitted.len(), 3);
    assert_eq!(tracker.laps().len(), 3);
    for (i, lap) in emitted.iter().enumerate() {
        assert_eq!(lap.index, i as u32 + 1);
        assert!((lap.distance_m - 500.0).abs() < 1e-6);
    }
    assert!(emitted[0].elapsed_ms < emitted[1].elapsed_ms);
    assert!(emitted[1].elapsed_ms < emitted[2].elapsed_ms);
}

#[test]
fn zero_lap_distance_disables_tracking() {
    let mut tracker = LapTracker::new(0.0);
    let emitted = tracker.on_distance_update(10_000.0, 1_000_000);
    assert!(emitted.is_empty());
}

#[test]
fn restore_resumes_from_carryover_laps() {
    let mut tracker = LapTracker::new(500.0);
    let first = tracker.on_distance_update(500.0, 100_000);
    assert_eq!(first.len(), 1);

    let mut resumed = LapTracker::new(500.0);
    resumed.restore(tracker.laps().to_vec(), 500.0, 100_000);
    let next = resumed.on_distance_update(1_000.0, 200_000);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].index, 2);
}
