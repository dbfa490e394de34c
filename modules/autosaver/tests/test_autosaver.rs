// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use autosaver::AutoSaver;
use common::goal::GoalSpec;
use common::mode::Mode;
use module_core::{
    Event, EventBus, EventKind, EventKindType, Module, StartParams,
    test_helper::{stop_module, wait_for_event},
};
use std::time::Duration;

fn spawn(eb: &EventBus) -> tokio::task::JoinHandle<Result<(), ()>> {
    let mut saver = AutoSaver::new(eb.context());
    tokio::spawn(async move { saver.run().await })
}

fn start(eb: &EventBus, started_at_ms: i64, mode: Mode) {
    eb.publish(&Event {
        kind: EventKind::StartCommand(StartParams {
            mode,
            goal: GoalSpec::None,
            lap_distance_m: 400.0,
            ghost: None,
        }),
    });
    eb.publish(&Event {
        kind: EventKind::SessionStartedEvent { started_at_ms, mode },
    });
}

fn metric_tick(eb: &EventBus, distance_m: f64, elapsed_ms: i64) {
    eb.publish(&Event {
        kind: EventKind::MetricTickEvent {
            distance_m,
            elapsed_ms,
            current_pace_ms_per_km: None,
            avg_pace_ms_per_km: Some(300_000),
            steps: None,
        },
    });
}

async fn assert_no_save_blob_request(rx: &mut tokio::sync::broadcast::Receiver<Event>, window: Duration) {
    let result = tokio::time::timeout(window, async {
        loop {
            if let Ok(event) = rx.recv().await
                && event.event_type() == EventKindType::SaveBlobRequestEvent
            {
                return;
            }
        }
    })
    .await;
    assert!(result.is_err(), "expected no auto-save flush within the window");
}

#[tokio::test]
#[test_log::test]
async fn test_first_tick_flushes_immediately() {
    let eb = EventBus::default();
    let mut handle = spawn(&eb);
    let mut rx = eb.subscribe();

    start(&eb, 1_000, Mode::Run);
    metric_tick(&eb, 100.0, 30_000);
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 1_000 },
    });

    let event = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;
    match event.kind {
        EventKind::SaveBlobRequestEvent { key, json } => {
            assert_eq!(key, "history");
            assert!(json.contains("\"auto_saved\":true"));
            assert!(json.contains("\"id\":\"1000\""));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn test_does_not_flush_before_the_periodic_interval_elapses() {
    let eb = EventBus::default();
    let mut handle = spawn(&eb);
    let mut rx = eb.subscribe();

    start(&eb, 2_000, Mode::Run);
    metric_tick(&eb, 50.0, 10_000);
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 2_000 },
    });
    let _ = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;

    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 2_000 + 59_000 },
    });
    assert_no_save_blob_request(&mut rx, Duration::from_millis(150)).await;

    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 2_000 + 61_000 },
    });
    let _ = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn test_large_tick_gap_flushes_immediately_even_before_interval() {
    let eb = EventBus::default();
    let mut handle = spawn(&eb);
    let mut rx = eb.subscribe();

    start(&eb, 3_000, Mode::Run);
    metric_tick(&eb, 20.0, 5_000);
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 3_000 },
    });
    let _ = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;

    // A 6s gap (>= the 5s lifecycle threshold) well before the 60s periodic
    // interval — simulates a foreground/background round trip.
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 3_000 + 6_000 },
    });
    let _ = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn test_no_flush_while_paused() {
    let eb = EventBus::default();
    let mut handle = spawn(&eb);
    let mut rx = eb.subscribe();

    start(&eb, 4_000, Mode::Run);
    metric_tick(&eb, 10.0, 2_000);
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 4_000 },
    });
    let _ = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;

    eb.publish(&Event {
        kind: EventKind::SessionPausedEvent,
    });
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 4_000 + 70_000 },
    });
    assert_no_save_blob_request(&mut rx, Duration::from_millis(150)).await;

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn test_session_ended_resets_phase_to_idle() {
    let eb = EventBus::default();
    let mut handle = spawn(&eb);
    let mut rx = eb.subscribe();

    start(&eb, 5_000, Mode::Run);
    metric_tick(&eb, 10.0, 2_000);
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 5_000 },
    });
    let _ = wait_for_event(&mut rx, Duration::from_millis(200), EventKindType::SaveBlobRequestEvent).await;

    eb.publish(&Event {
        kind: EventKind::SessionEndedEvent(module_core::SessionSummary {
            record: common::session_record::SessionRecord {
                id: "5000".into(),
                mode: Mode::Run,
                started_at_ms: 5_000,
                duration_ms: 2_000,
                distance_m: 10.0,
                avg_pace_ms_per_km: 0,
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
                auto_saved: false,
                migrated_from_carryover: false,
            },
        }),
    });
    eb.publish(&Event {
        kind: EventKind::TickEvent { now_ms: 5_000 + 70_000 },
    });
    assert_no_save_blob_request(&mut rx, Duration::from_millis(150)).await;

    stop_module(&eb, &mut handle).await;
}
