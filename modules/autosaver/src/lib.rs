// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Periodic and lifecycle-triggered auto-save (§4.10).
//!
//! `AutoSaver` never touches `SessionFsm`'s state directly; it mirrors the
//! handful of fields it needs from the events already flowing across the
//! bus (`StartCommand`, `SessionStartedEvent`, `MetricTickEvent`,
//! `LapCompletedEvent`, lifecycle events) and writes a partial,
//! `auto_saved=true` snapshot into history under the same id `SessionFsm`
//! will later finalize with. `HistoryStore`'s merge-upsert (§4.9) takes
//! care of reconciling the two.
//!
//! `Tick` doubles as this module's cadence source (§6): there is no
//! separate foreground/background event in this workspace's vocabulary,
//! since lifecycle hooks only ever surface as an extra `Tick` (§9). A tick
//! whose gap since the previous one is unusually large is treated as that
//! extra, out-of-band tick and flushed immediately instead of waiting out
//! the periodic interval.

use common::goal::GoalSpec;
use common::lap::Lap;
use common::mode::Mode;
use common::session_record::SessionRecord;
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};

/// Periodic auto-save cadence while Active (§4.10).
const PERIODIC_FLUSH_INTERVAL_MS: i64 = 60_000;
/// A `Tick` gap at least this large is treated as a foreground/background
/// round trip rather than a missed heartbeat, and flushed immediately.
const LIFECYCLE_GAP_THRESHOLD_MS: i64 = 5_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    Paused,
}

/// Mirrors just enough of the current session to write a safety-net
/// `SessionRecord` on a periodic or lifecycle cadence.
pub struct AutoSaver {
    ctx: ModuleCtx,
    phase: Phase,
    mode: Mode,
    goal: GoalSpec,
    started_at_ms: i64,
    distance_m: f64,
    elapsed_ms: i64,
    avg_pace_ms_per_km: i64,
    steps: Option<u32>,
    laps: Vec<Lap>,
    last_tick_ms: Option<i64>,
    last_flush_tick_ms: Option<i64>,
}

impl AutoSaver {
    pub fn new(ctx: ModuleCtx) -> Self {
        Self {
            ctx,
            phase: Phase::Idle,
            mode: Mode::Run,
            goal: GoalSpec::None,
            started_at_ms: 0,
            distance_m: 0.0,
            elapsed_ms: 0,
            avg_pace_ms_per_km: 0,
            steps: None,
            laps: Vec::new(),
            last_tick_ms: None,
            last_flush_tick_ms: None,
        }
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.ctx.publish_event(kind);
    }

    fn on_session_started(&mut self, started_at_ms: i64, mode: Mode) {
        self.phase = Phase::Active;
        self.mode = mode;
        self.started_at_ms = started_at_ms;
        self.distance_m = 0.0;
        self.elapsed_ms = 0;
        self.avg_pace_ms_per_km = 0;
        self.steps = None;
        self.laps.clear();
        self.last_tick_ms = None;
        self.last_flush_tick_ms = None;
    }

    fn build_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.started_at_ms.to_string(),
            mode: self.mode,
            started_at_ms: self.started_at_ms,
            duration_ms: self.elapsed_ms,
            distance_m: self.distance_m,
            avg_pace_ms_per_km: self.avg_pace_ms_per_km,
            laps: self.laps.clone(),
            route: Vec::new(),
            steps: self.steps,
            calories: None,
            cadence_spm: None,
            stride_m: None,
            elevation_gain_m: None,
            goal: Some(self.goal),
            goal_progress_pct: None,
            ghost_result: None,
            auto_saved: true,
            migrated_from_carryover: false,
        }
    }

    fn flush(&mut self, now_ms: i64, reason: &'static str) {
        let record = self.build_record();
        match serde_json::to_string(&record) {
            Ok(json) => {
                info!(
                    distance_m = self.distance_m,
                    elapsed_ms = self.elapsed_ms,
                    reason,
                    "auto-save flush"
                );
                self.publish(EventKind::SaveBlobRequestEvent {
                    key: "history".to_string(),
                    json: Arc::new(json),
                });
            }
            Err(e) => error!(error = %e, "auto-save serialization failed"),
        }
        self.last_flush_tick_ms = Some(now_ms);
    }

    fn on_tick(&mut self, now_ms: i64) {
        if self.phase != Phase::Active {
            self.last_tick_ms = Some(now_ms);
            return;
        }

        let gap = self.last_tick_ms.map(|prev| now_ms - prev);
        let lifecycle_gap = gap.is_some_and(|g| g >= LIFECYCLE_GAP_THRESHOLD_MS);
        self.last_tick_ms = Some(now_ms);

        if lifecycle_gap {
            debug!(gap_ms = gap.unwrap_or(0), "lifecycle tick gap observed");
            self.flush(now_ms, "lifecycle");
            return;
        }

        let due = match self.last_flush_tick_ms {
            None => true,
            Some(last) => now_ms - last >= PERIODIC_FLUSH_INTERVAL_MS,
        };
        if due {
            self.flush(now_ms, "periodic");
        }
    }
}

#[async_trait::async_trait]
impl Module for AutoSaver {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => break,
                    EventKind::StartCommand(params) => {
                        self.goal = params.goal;
                    }
                    EventKind::SessionStartedEvent { started_at_ms, mode } => {
                        self.on_session_started(started_at_ms, mode);
                    }
                    EventKind::SessionPausedEvent => {
                        if self.phase == Phase::Active {
                            self.phase = Phase::Paused;
                        }
                    }
                    EventKind::SessionResumedEvent => {
                        self.phase = Phase::Active;
                    }
                    EventKind::SessionEndedEvent(_) => {
                        self.phase = Phase::Idle;
                    }
                    EventKind::MetricTickEvent {
                        distance_m,
                        elapsed_ms,
                        avg_pace_ms_per_km,
                        steps,
                        ..
                    } => {
                        self.distance_m = distance_m;
                        self.elapsed_ms = elapsed_ms;
                        if let Some(pace) = avg_pace_ms_per_km {
                            self.avg_pace_ms_per_km = pace;
                        }
                        if steps.is_some() {
                            self.steps = steps;
                        }
                    }
                    EventKind::LapCompletedEvent { lap, .. } => {
                        self.laps.push(lap);
                    }
                    EventKind::TickEvent { now_ms } => {
                        self.on_tick(now_ms);
                    }
                    _ => (),
                },
                Err(RecvError::Lagged(skipped)) => {
                    error!(skipped, "auto-saver lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok(())
    }
}
