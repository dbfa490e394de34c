// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Owns the session state machine and routes bus events into the pure
//! `algorithm` components (§4.7).
//!
//! `SessionFsm` is a thin async `Module` shell: it drains the shared
//! `EventBus`, forwards every accepted input into its single-writer
//! session state, and publishes the resulting outputs — metric ticks,
//! laps, ghost deltas, goal trips, lifecycle events — in the order §4.7
//! requires. None of the fusion math lives here; it lives in `algorithm`.

use algorithm::clock::SessionClock;
use algorithm::geo_filter::{GeoFilter, GeoFilterConfig};
use algorithm::ghost_runner::GhostRunner;
use algorithm::goal_watcher::GoalWatcher;
use algorithm::lap_tracker::LapTracker;
use algorithm::step_integrator::StepIntegrator;
use common::carryover::CarryoverSnapshot;
use common::date_key::date_key_for_ts_ms;
use common::error::{EngineError, ErrorKind};
use common::goal::GoalSpec;
use common::mode::Mode;
use common::sensor::{AccelSample, LocationFix, StepReading};
use common::session_record::{RoutePoint, SessionRecord};
use module_core::{EventKind, Module, ModuleCtx, SessionSummary, StartParams};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, trace};

/// The session lifecycle state (§3, §4.7). A `Run`-mode `Stop` finalizes
/// the record and falls straight back to `Idle`; there is no lingering
/// `Ended` state to drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    Paused,
}

/// A thin async `Module` shell around the single-writer session core.
pub struct SessionFsm {
    ctx: ModuleCtx,
    phase: Phase,
    mode: Mode,
    goal: GoalSpec,
    lap_distance_m: f64,
    started_at_ms: i64,
    /// The most recent timestamp observed on any event. Used as "now" for
    /// command-triggered transitions (`Pause`/`Resume`/`Stop`/`Start`),
    /// none of which carry a timestamp of their own — the engine never
    /// reads a live clock, only timestamps embedded in events (§5).
    last_ts_ms: i64,
    distance_m: f64,
    route: Vec<RoutePoint>,
    /// Step delta accumulated since the last accepted GPS segment, fed to
    /// `StepIntegrator::adapt_stride` on the next acceptance.
    pending_step_delta: u32,
    prev_metric_distance_m: f64,
    prev_metric_ts_ms: i64,
    geo_filter_config: GeoFilterConfig,
    geo: GeoFilter,
    steps: StepIntegrator,
    clock: SessionClock,
    laps: LapTracker,
    goal_watcher: GoalWatcher,
    ghost: Option<GhostRunner>,
    carryover: Option<Arc<CarryoverSnapshot>>,
}

impl SessionFsm {
    pub fn new(ctx: ModuleCtx, initial_stride_m: Option<f32>, geo_filter_config: GeoFilterConfig) -> Self {
        SessionFsm {
            ctx,
            phase: Phase::Idle,
            mode: Mode::Run,
            goal: GoalSpec::None,
            lap_distance_m: 500.0,
            started_at_ms: 0,
            last_ts_ms: 0,
            distance_m: 0.0,
            route: Vec::new(),
            pending_step_delta: 0,
            prev_metric_distance_m: 0.0,
            prev_metric_ts_ms: 0,
            geo: GeoFilter::new(Mode::Run, geo_filter_config),
            geo_filter_config,
            steps: StepIntegrator::new(initial_stride_m),
            clock: SessionClock::new(Mode::Run),
            laps: LapTracker::new(500.0),
            goal_watcher: GoalWatcher::new(GoalSpec::None),
            ghost: None,
            carryover: None,
        }
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.ctx.publish_event(kind);
    }

    fn emit_error(&self, kind: ErrorKind, detail: impl Into<String>) {
        let detail = detail.into();
        error!(?kind, %detail, "state_violation");
        self.publish(EventKind::ErrorObservedEvent(EngineError::new(kind, detail)));
    }

    fn touch_ts(&mut self, ts_ms: i64) {
        self.last_ts_ms = self.last_ts_ms.max(ts_ms);
    }

    // --- inputs -----------------------------------------------------

    fn on_location_fix(&mut self, fix: LocationFix) {
        self.touch_ts(fix.ts_ms);
        if self.phase != Phase::Active {
            return;
        }

        let update = self.geo.on_location(fix, fix.ts_ms);
        trace!(accepted = update.accepted, reason = ?update.reason, delta_m = update.delta_m, "geo filter");
        if update.accepted {
            self.distance_m = self.geo.total_distance_m();
            self.route.push(RoutePoint {
                lat: fix.lat,
                lon: fix.lon,
                ts_ms: fix.ts_ms,
            });
            if self.mode == Mode::Walk {
                self.clock.on_moving_hint(fix.ts_ms);
                if update.delta_m > 0.0 {
                    self.steps.adapt_stride(update.delta_m, self.pending_step_delta);
                }
            }
            self.pending_step_delta = 0;
        }
        self.post_update(fix.ts_ms);
    }

    fn on_step_reading(&mut self, reading: StepReading) {
        self.touch_ts(reading.ts_ms);
        if self.phase == Phase::Paused {
            self.steps.on_paused(reading.raw_counter);
            return;
        }
        if self.phase != Phase::Active {
            return;
        }

        let update = self.steps.on_step_reading(reading);
        self.pending_step_delta = self.pending_step_delta.saturating_add(update.delta_steps);
        if self.mode == Mode::Walk && update.delta_steps > 0 {
            let active_ms = update.active_time_ms(self.steps.stride_m());
            self.clock.add_active_ms(active_ms);
            self.clock.on_moving_hint(reading.ts_ms);
        }
        self.post_update(reading.ts_ms);
    }

    fn on_accel_sample(&mut self, sample: AccelSample) {
        self.touch_ts(sample.ts_ms);
        if self.phase == Phase::Active && self.mode == Mode::Walk {
            self.clock.on_moving_hint(sample.ts_ms);
        }
    }

    fn on_tick(&mut self, now_ms: i64) {
        self.touch_ts(now_ms);
        if self.phase == Phase::Active {
            self.post_update(now_ms);
        }
    }

    // --- commands -----------------------------------------------------

    fn on_start(&mut self, params: StartParams) {
        if self.phase != Phase::Idle {
            self.emit_error(ErrorKind::StateViolation, "start while not idle");
            return;
        }
        let now = self.last_ts_ms;
        self.mode = params.mode;
        self.goal = params.goal;
        self.lap_distance_m = if params.lap_distance_m > 0.0 {
            params.lap_distance_m
        } else {
            500.0
        };

        let mut distance_offset = 0.0;
        let mut elapsed_offset = 0i64;
        let mut steps_offset = 0u32;
        let mut restored_laps = Vec::new();
        if self.mode == Mode::Walk
            && let Some(snapshot) = self.carryover.take()
            && snapshot.date_key == date_key_for_ts_ms(now)
        {
            distance_offset = snapshot.distance_m;
            elapsed_offset = snapshot.elapsed_ms;
            steps_offset = snapshot.steps;
            restored_laps = snapshot.laps.clone();
            self.lap_distance_m = snapshot.lap_distance_m;
            debug!(date_key = %snapshot.date_key, "resuming from carry-over");
        }

        self.distance_m = distance_offset;
        self.route.clear();
        self.pending_step_delta = 0;
        self.prev_metric_distance_m = distance_offset;
        self.prev_metric_ts_ms = now;

        self.geo = GeoFilter::new(self.mode, self.geo_filter_config);
        self.geo.reset(distance_offset);
        self.steps.reset(steps_offset);
        self.clock = SessionClock::new(self.mode);
        self.clock.start(now, elapsed_offset);
        self.laps = LapTracker::new(self.lap_distance_m);
        if !restored_laps.is_empty() {
            self.laps.restore(restored_laps, distance_offset, elapsed_offset);
        }
        self.goal_watcher = GoalWatcher::new(self.goal);
        self.ghost = params.ghost.map(GhostRunner::new);
        self.started_at_ms = now;
        self.phase = Phase::Active;

        info!(mode = ?self.mode, started_at_ms = now, "session started");
        self.publish(EventKind::SessionStartedEvent {
            started_at_ms: now,
            mode: self.mode,
        });
    }

    fn on_pause(&mut self) {
        if self.phase != Phase::Active {
            self.emit_error(ErrorKind::StateViolation, "pause while not active");
            return;
        }
        let now = self.last_ts_ms;
        self.clock.pause(now);
        self.phase = Phase::Paused;
        info!("session paused");
        self.publish(EventKind::SessionPausedEvent);
        self.save_carryover(now, true);
    }

    fn on_resume(&mut self) {
        if self.phase != Phase::Paused {
            self.emit_error(ErrorKind::StateViolation, "resume while not paused");
            return;
        }
        let now = self.last_ts_ms;
        self.clock.resume(now);
        // Force the next GPS fix to be treated as a fresh anchor rather than
        // measuring the (unrelated) distance covered while paused.
        self.geo.reset(self.distance_m);
        self.phase = Phase::Active;
        info!("session resumed");
        self.publish(EventKind::SessionResumedEvent);
    }

    fn on_stop(&mut self) {
        if self.phase == Phase::Idle {
            self.emit_error(ErrorKind::StateViolation, "stop while idle");
            return;
        }
        let now = self.last_ts_ms;
        match self.mode {
            Mode::Run => {
                let elapsed_ms = self.clock.elapsed_ms(now);
                let avg_pace = SessionRecord::compute_avg_pace_ms_per_km(self.distance_m, elapsed_ms);
                let record = self.build_record(elapsed_ms, avg_pace, false);
                self.save_history(&record);
                info!(distance_m = self.distance_m, elapsed_ms, "session ended");
                self.publish(EventKind::SessionEndedEvent(SessionSummary { record }));
                self.reset_to_idle();
            }
            Mode::Walk => {
                self.clock.pause(now);
                self.phase = Phase::Paused;
                self.save_carryover(now, true);
                info!("walk session suspended to carry-over");
                self.publish(EventKind::SessionPausedEvent);
            }
        }
    }

    fn on_set_stride(&mut self, stride_m: f32) {
        self.steps.set_stride_m(stride_m);
    }

    fn on_carryover_loaded(&mut self, snapshot: Option<Arc<CarryoverSnapshot>>) {
        self.carryover = snapshot;
    }

    // --- pipeline -----------------------------------------------------

    /// Runs the §4.7 emission order for one input: metric update → lap →
    /// ghost-delta → goal-reached → (walk-mode) carry-over save hint.
    fn post_update(&mut self, now_ms: i64) {
        let elapsed_ms = self.clock.on_tick(now_ms);
        let avg_pace_ms_per_km = SessionRecord::compute_avg_pace_ms_per_km(self.distance_m, elapsed_ms);

        let current_pace_ms_per_km = {
            let segment_m = self.distance_m - self.prev_metric_distance_m;
            let segment_ms = now_ms - self.prev_metric_ts_ms;
            (segment_m > 0.0 && segment_ms > 0)
                .then(|| SessionRecord::compute_avg_pace_ms_per_km(segment_m, segment_ms))
        };
        self.prev_metric_distance_m = self.distance_m;
        self.prev_metric_ts_ms = now_ms;

        self.publish(EventKind::MetricTickEvent {
            distance_m: self.distance_m,
            elapsed_ms,
            current_pace_ms_per_km,
            avg_pace_ms_per_km: Some(avg_pace_ms_per_km),
            steps: (self.mode == Mode::Walk).then(|| self.steps.session_steps()),
        });

        for lap in self.laps.on_distance_update(self.distance_m, elapsed_ms) {
            info!(index = lap.index, distance_m = lap.distance_m, "lap completed");
            self.publish(EventKind::LapCompletedEvent {
                lap,
                avg_pace_ms_per_km: lap.pace_ms_per_km,
            });
        }

        if let Some(ghost) = self.ghost.as_mut() {
            for delta in ghost.on_distance_update(self.distance_m, elapsed_ms) {
                self.publish(EventKind::GhostDeltaEvent {
                    km: delta.km,
                    diff_seconds: delta.diff_seconds,
                });
            }
        }

        if let Some(reached) = self.goal_watcher.check(self.distance_m, elapsed_ms, avg_pace_ms_per_km) {
            if let Some(ghost) = self.ghost.as_mut() {
                ghost.mark_goal_completed();
            }
            info!(distance_m = reached.distance_m, elapsed_ms = reached.elapsed_ms, "goal reached");
            self.publish(EventKind::GoalReachedEvent {
                goal: reached.goal,
                elapsed_ms: reached.elapsed_ms,
                distance_m: reached.distance_m,
                avg_pace_ms_per_km: reached.avg_pace_ms_per_km,
            });
        }

        if self.mode == Mode::Walk {
            self.save_carryover(now_ms, false);
        }
    }

    fn build_record(&self, elapsed_ms: i64, avg_pace_ms_per_km: i64, auto_saved: bool) -> SessionRecord {
        let goal_progress_pct = match self.goal {
            GoalSpec::Distance(meters) if meters > 0 => {
                Some(((self.distance_m / meters as f64) * 100.0) as f32)
            }
            GoalSpec::Time(millis) if millis > 0 => {
                Some(((elapsed_ms as f64 / millis as f64) * 100.0) as f32)
            }
            _ => None,
        };
        SessionRecord {
            id: self.started_at_ms.to_string(),
            mode: self.mode,
            started_at_ms: self.started_at_ms,
            duration_ms: elapsed_ms,
            distance_m: self.distance_m,
            avg_pace_ms_per_km,
            laps: self.laps.laps().to_vec(),
            route: self.route.clone(),
            steps: (self.mode == Mode::Walk).then(|| self.steps.session_steps()),
            calories: None,
            cadence_spm: None,
            stride_m: (self.mode == Mode::Walk).then(|| self.steps.stride_m()),
            elevation_gain_m: None,
            goal: Some(self.goal),
            goal_progress_pct,
            ghost_result: self.ghost.as_ref().map(|g| g.finish(self.distance_m, elapsed_ms)),
            auto_saved,
            migrated_from_carryover: false,
        }
    }

    /// Publishes the finalized record for `BlobStore` to merge-upsert into
    /// the `history` key (§4.9). The payload is a single record, not the
    /// whole list — `BlobStore` owns decoding, merging, and re-encoding.
    fn save_history(&self, record: &SessionRecord) {
        match serde_json::to_string(record) {
            Ok(json) => self.publish(EventKind::SaveBlobRequestEvent {
                key: "history".to_string(),
                json: Arc::new(json),
            }),
            Err(e) => self.emit_error(ErrorKind::PersistenceFailed, e.to_string()),
        }
    }

    /// Publishes the current carry-over snapshot for `BlobStore` to persist
    /// under the `carryover` key (§4.8). `BlobStore` owns the 500ms write
    /// coalescing; every call here is a hint, not a guaranteed write.
    fn save_carryover(&self, now_ms: i64, is_paused: bool) {
        if self.mode != Mode::Walk {
            return;
        }
        let snapshot = CarryoverSnapshot {
            date_key: date_key_for_ts_ms(now_ms),
            mode: self.mode,
            distance_m: self.distance_m,
            elapsed_ms: self.clock.elapsed_ms(now_ms),
            steps: self.steps.session_steps(),
            laps: self.laps.laps().to_vec(),
            lap_distance_m: self.lap_distance_m,
            is_paused,
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => self.publish(EventKind::SaveBlobRequestEvent {
                key: "carryover".to_string(),
                json: Arc::new(json),
            }),
            Err(e) => self.emit_error(ErrorKind::PersistenceFailed, e.to_string()),
        }
    }

    fn reset_to_idle(&mut self) {
        self.phase = Phase::Idle;
        self.distance_m = 0.0;
        self.route.clear();
        self.pending_step_delta = 0;
        self.goal = GoalSpec::None;
        self.ghost = None;
    }
}

#[async_trait::async_trait]
impl Module for SessionFsm {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => break,
                    EventKind::LocationFixEvent(fix) => self.on_location_fix(fix),
                    EventKind::StepReadingEvent(reading) => self.on_step_reading(reading),
                    EventKind::AccelSampleEvent(sample) => self.on_accel_sample(sample),
                    EventKind::TickEvent { now_ms } => self.on_tick(now_ms),
                    EventKind::StartCommand(params) => self.on_start(params),
                    EventKind::PauseCommand => self.on_pause(),
                    EventKind::ResumeCommand => self.on_resume(),
                    EventKind::StopCommand => self.on_stop(),
                    EventKind::SetStrideCommand { stride_m } => self.on_set_stride(stride_m),
                    EventKind::LoadCarryoverResponseEvent { snapshot } => {
                        self.on_carryover_loaded(snapshot)
                    }
                    _ => (),
                },
                Err(RecvError::Lagged(skipped)) => {
                    error!(skipped, "session_fsm lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok(())
    }
}
