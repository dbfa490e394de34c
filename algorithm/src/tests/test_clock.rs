use crate::clock::SessionClock;
use common::mode::Mode;

#[test]
fn run_regime_freezes_during_pause_and_resumes() {
    let mut clock = SessionClock::new(Mode::Run);
    clock.start(0, 0);
    assert_eq!(clock.on_tick(1000), 1000);

    clock.pause(1000);
    assert_eq!(clock.elapsed_ms(5000), 1000, "elapsed must not advance while paused");

    clock.resume(6000);
    assert_eq!(clock.on_tick(7000), 2000);
}

#[test]
fn run_regime_seeds_from_carryover_offset() {
    let mut clock = SessionClock::new(Mode::Run);
    clock.start(1_000, 42_000);
    assert_eq!(clock.on_tick(3_000), 44_000);
}

#[test]
fn walk_regime_ticks_only_within_moving_window() {
    let mut clock = SessionClock::new(Mode::Walk);
    clock.start(0, 0);

    clock.on_moving_hint(0);
    assert_eq!(clock.on_tick(2_000), 2_000);

    // No further motion observed; the gap since the last hint exceeds the window.
    assert_eq!(clock.on_tick(8_000), 2_000);

    clock.on_moving_hint(8_000);
    assert_eq!(clock.on_tick(9_000), 3_000);
}

#[test]
fn walk_pause_flushes_accumulator_before_freezing() {
    let mut clock = SessionClock::new(Mode::Walk);
    clock.start(0, 0);
    clock.on_moving_hint(0);
    clock.pause(3_000);

    assert_eq!(clock.elapsed_ms(10_000), 3_000);
}

#[test]
fn walk_add_active_ms_contributes_directly() {
    let mut clock = SessionClock::new(Mode::Walk);
    clock.start(0, 0);
    clock.add_active_ms(500);
    assert_eq!(clock.elapsed_ms(1_000), 500);
}
