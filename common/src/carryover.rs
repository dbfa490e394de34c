use crate::lap::Lap;
use crate::mode::Mode;
use serde::{Deserialize, Serialize};

/// A same-day persisted snapshot of a walk session.
///
/// Exactly one of these exists in the `BlobStore` at a time, keyed by
/// `date_key`; `CarryoverStore` migrates the previous day's snapshot into
/// history before replacing it with a new date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarryoverSnapshot {
    pub date_key: String,
    pub mode: Mode,
    pub distance_m: f64,
    pub elapsed_ms: i64,
    pub steps: u32,
    pub laps: Vec<Lap>,
    pub lap_distance_m: f64,
    pub is_paused: bool,
}

impl CarryoverSnapshot {
    /// A snapshot is worth migrating into history only if it recorded
    /// any activity; an all-zero snapshot from a day that was opened but
    /// never started is dropped silently.
    pub fn has_activity(&self) -> bool {
        self.distance_m > 0.0 || self.elapsed_ms > 0 || self.steps > 0
    }
}
