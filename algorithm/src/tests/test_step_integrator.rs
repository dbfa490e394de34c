use crate::step_integrator::{StepIntegrator, StepUpdate};
use common::sensor::StepReading;

fn reading(raw_counter: u64, ts_ms: i64) -> StepReading {
    StepReading {
        raw_counter,
        ts_ms,
        distance_m: None,
    }
}

/// S4 — a reading just before midnight and one just after: the post-flip
/// session step count folds in the pre-midnight total plus the rollover delta.
#[test]
fn s4_midnight_rollover_folds_pre_and_post_counts() {
    let before_midnight_1 = 1_704_153_595_000; // 2024-01-01T23:59:55Z
    let before_midnight_2 = 1_704_153_598_000; // 2024-01-01T23:59:58Z
    let after_midnight = 1_704_153_605_000; // 2024-01-02T00:00:05Z

    let mut integrator = StepIntegrator::new(None);
    integrator.on_step_reading(reading(10_000, before_midnight_1));
    let before_flip = integrator.on_step_reading(reading(10_010, before_midnight_2));
    assert_eq!(before_flip.session_steps, 10);

    let after_flip = integrator.on_step_reading(reading(10_025, after_midnight));
    assert_eq!(after_flip.session_steps, 25);
}

#[test]
fn resume_with_no_hidden_steps_leaves_count_unchanged() {
    let mut integrator = StepIntegrator::new(None);
    integrator.on_step_reading(reading(100, 0));
    let before_pause = integrator.on_step_reading(reading(110, 1_000));
    assert_eq!(before_pause.session_steps, 10);

    integrator.on_paused(110);
    let resumed = integrator.on_step_reading(reading(110, 5_000));
    assert_eq!(resumed.session_steps, 10);

    let continued = integrator.on_step_reading(reading(115, 6_000));
    assert_eq!(continued.session_steps, 15);
}

#[test]
fn sensor_reset_clamps_to_monotonic_non_decreasing() {
    let mut integrator = StepIntegrator::new(None);
    integrator.on_step_reading(reading(1_000, 0));
    let before_reset = integrator.on_step_reading(reading(1_010, 1_000));
    assert_eq!(before_reset.session_steps, 10);

    // Device counter dropped below the current base: a sensor restart.
    let during_reset = integrator.on_step_reading(reading(5, 2_000));
    assert_eq!(during_reset.session_steps, 10, "must never go backward");

    let after_reset = integrator.on_step_reading(reading(20, 3_000));
    assert_eq!(after_reset.session_steps, 15);
}

#[test]
fn stride_adapts_within_plausible_range_only() {
    let mut integrator = StepIntegrator::new(Some(0.75));
    integrator.adapt_stride(12.0, 15);
    assert!((integrator.stride_m() - 0.76).abs() < 1e-6);

    integrator.adapt_stride(5.0, 15); // segment too short
    assert!((integrator.stride_m() - 0.76).abs() < 1e-6);

    integrator.adapt_stride(100.0, 5); // too few steps
    assert!((integrator.stride_m() - 0.76).abs() < 1e-6);
}

#[test]
fn step_update_active_time_couples_to_walking_pace() {
    let update = StepUpdate {
        session_steps: 42,
        delta_steps: 10,
    };
    assert_eq!(update.active_time_ms(1.25), 10_000);
}
