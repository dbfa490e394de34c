// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! A synthetic sensor generator for demonstration, standing in for a real
//! GNSS/pedometer source. Grounded on the teacher's `ConstantGnssModule`:
//! a background `tokio::time::interval` loop, stopped by `QuitEvent`.

use common::mode::Mode;
use common::sensor::{LocationFix, StepReading};
use common::wall_clock::WallClock;
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const TICK_INTERVAL_MS: u64 = 1_000;
const START_LAT: f64 = 52.520_008;
const START_LON: f64 = 13.404_954;
const BEARING_RAD: f64 = 0.35;
const STEPS_PER_METER: f64 = 1.3;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Walks a straight line from a fixed start point at a constant speed,
/// emitting one `LocationFix` (and, in `Walk` mode, one `StepReading`) per
/// tick, plus a `Tick` every interval regardless of mode.
pub struct SyntheticSensorModule {
    ctx: ModuleCtx,
    mode: Mode,
    speed_mps: f64,
    wall_clock: Arc<dyn WallClock>,
    lat: f64,
    lon: f64,
    step_counter: u64,
}

impl SyntheticSensorModule {
    pub fn new(ctx: ModuleCtx, mode: Mode, speed_mps: f64, wall_clock: Arc<dyn WallClock>) -> Self {
        Self {
            ctx,
            mode,
            speed_mps,
            wall_clock,
            lat: START_LAT,
            lon: START_LON,
            step_counter: 0,
        }
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.ctx.publish_event(kind);
    }

    fn tick(&mut self) {
        let now_ms = self.wall_clock.now_ms();
        let dt_s = TICK_INTERVAL_MS as f64 / 1000.0;
        let distance_m = self.speed_mps * dt_s;

        let lat_rad = self.lat.to_radians();
        self.lat += (distance_m * BEARING_RAD.cos()) / METERS_PER_DEGREE_LAT;
        self.lon += (distance_m * BEARING_RAD.sin()) / (METERS_PER_DEGREE_LAT * lat_rad.cos().max(0.01));

        self.publish(EventKind::LocationFixEvent(LocationFix {
            lat: self.lat,
            lon: self.lon,
            ts_ms: now_ms,
            accuracy_m: Some(5.0),
            speed_mps: Some(self.speed_mps as f32),
            altitude_m: None,
        }));

        if self.mode == Mode::Walk {
            self.step_counter += (distance_m * STEPS_PER_METER).round() as u64;
            self.publish(EventKind::StepReadingEvent(StepReading {
                raw_counter: self.step_counter,
                ts_ms: now_ms,
                distance_m: Some(distance_m as f32),
            }));
        }

        self.publish(EventKind::TickEvent { now_ms });
    }
}

#[async_trait::async_trait]
impl Module for SyntheticSensorModule {
    async fn run(&mut self) -> Result<(), ()> {
        let mut timer = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.tick();
                }
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(Event { kind: EventKind::QuitEvent }) => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
            }
        }
        debug!("synthetic sensor stopped");
        Ok(())
    }
}
