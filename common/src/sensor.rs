use serde::{Deserialize, Serialize};

/// A single raw GPS fix pushed into the engine.
///
/// `ts_ms` is expected to be monotonic non-decreasing within a session;
/// the `GeoFilter` rejects out-of-order or non-finite fixes rather than
/// panicking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub lat: f64,
    pub lon: f64,
    pub ts_ms: i64,
    pub accuracy_m: Option<f32>,
    pub speed_mps: Option<f32>,
    pub altitude_m: Option<f32>,
}

impl LocationFix {
    /// True if `lat`/`lon` are finite and within valid geographic range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat.abs() <= 90.0
            && self.lon.abs() <= 180.0
    }
}

/// A raw device step-counter sample.
///
/// `raw_counter` is monotonic on the device but may reset (drop) when the
/// underlying sensor restarts; the `StepIntegrator` is responsible for
/// detecting and absorbing that.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepReading {
    pub raw_counter: u64,
    pub ts_ms: i64,
    pub distance_m: Option<f32>,
}

/// A raw accelerometer sample, used only as a walk-mode liveness hint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ts_ms: i64,
}
