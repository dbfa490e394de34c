use crate::mode::Mode;
use crate::session_record::SessionRecord;

fn base_record(distance_m: f64, duration_ms: i64, auto_saved: bool) -> SessionRecord {
    SessionRecord {
        id: "1000".into(),
        mode: Mode::Run,
        started_at_ms: 1000,
        duration_ms,
        distance_m,
        avg_pace_ms_per_km: SessionRecord::compute_avg_pace_ms_per_km(distance_m, duration_ms),
        laps: vec![],
        route: vec![],
        steps: None,
        calories: None,
        cadence_spm: None,
        stride_m: None,
        elevation_gain_m: None,
        goal: None,
        goal_progress_pct: None,
        ghost_result: None,
        auto_saved,
        migrated_from_carryover: false,
    }
}

#[test]
fn merge_upsert_takes_element_wise_max() {
    let earlier = base_record(1_000.0, 300_000, true);
    let later = base_record(800.0, 400_000, true);
    let merged = earlier.merge_upsert(&later);
    assert_eq!(merged.distance_m, 1_000.0);
    assert_eq!(merged.duration_ms, 400_000);
}

#[test]
fn merge_upsert_final_non_auto_saved_write_wins() {
    let auto_saved = base_record(1_000.0, 300_000, true);
    let finalized = base_record(1_000.0, 300_000, false);
    let merged = auto_saved.merge_upsert(&finalized);
    assert!(!merged.auto_saved);

    let merged_reverse = finalized.merge_upsert(&auto_saved);
    assert!(!merged_reverse.auto_saved);
}

#[test]
fn avg_pace_recomputed_from_merged_totals() {
    let earlier = base_record(1_000.0, 300_000, true);
    let later = base_record(2_000.0, 500_000, true);
    let merged = earlier.merge_upsert(&later);
    assert_eq!(
        merged.avg_pace_ms_per_km,
        SessionRecord::compute_avg_pace_ms_per_km(2_000.0, 500_000)
    );
}

#[test]
fn zero_distance_has_zero_pace() {
    assert_eq!(SessionRecord::compute_avg_pace_ms_per_km(0.0, 300_000), 0);
}
