use crate::ghost::GhostResult;
use crate::goal::GoalSpec;
use crate::lap::Lap;
use crate::mode::Mode;
use serde::{Deserialize, Serialize};

/// A single recorded location point kept for a session's `route`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
    pub ts_ms: i64,
}

/// The unit persisted to history: a finalized or auto-saved snapshot of a session.
///
/// `id` is the session's `started_at_ms` formatted as a string, which is
/// what makes `HistoryStore::upsert` idempotent across auto-save and
/// finalize writes for the same session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub mode: Mode,
    pub started_at_ms: i64,
    pub duration_ms: i64,
    pub distance_m: f64,
    pub avg_pace_ms_per_km: i64,
    pub laps: Vec<Lap>,
    pub route: Vec<RoutePoint>,
    pub steps: Option<u32>,
    pub calories: Option<f32>,
    pub cadence_spm: Option<f32>,
    pub stride_m: Option<f32>,
    pub elevation_gain_m: Option<f32>,
    pub goal: Option<GoalSpec>,
    pub goal_progress_pct: Option<f32>,
    pub ghost_result: Option<GhostResult>,
    pub auto_saved: bool,
    /// Set when this record was produced by migrating a stale `CarryoverSnapshot`
    /// into history on date rollover (§4.8), rather than by a normal session stop.
    pub migrated_from_carryover: bool,
}

impl SessionRecord {
    /// Average pace in milliseconds per kilometre, or `0` if distance is zero.
    pub fn compute_avg_pace_ms_per_km(distance_m: f64, duration_ms: i64) -> i64 {
        if distance_m <= 0.0 || duration_ms <= 0 {
            return 0;
        }
        ((duration_ms as f64) * 1000.0 / distance_m).round() as i64
    }

    /// Merges `other` into `self` per the HistoryStore upsert rule (§4.9):
    /// element-wise max of distance/duration/steps, and the most recent
    /// non-auto-saved write wins `auto_saved = false`.
    pub fn merge_upsert(&self, other: &SessionRecord) -> SessionRecord {
        let distance_m = self.distance_m.max(other.distance_m);
        let duration_ms = self.duration_ms.max(other.duration_ms);
        let steps = match (self.steps, other.steps) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        };
        let auto_saved = self.auto_saved && other.auto_saved;
        let avg_pace_ms_per_km = Self::compute_avg_pace_ms_per_km(distance_m, duration_ms);
        SessionRecord {
            id: other.id.clone(),
            mode: other.mode,
            started_at_ms: other.started_at_ms,
            duration_ms,
            distance_m,
            avg_pace_ms_per_km,
            laps: other.laps.clone(),
            route: other.route.clone(),
            steps,
            calories: other.calories.or(self.calories),
            cadence_spm: other.cadence_spm.or(self.cadence_spm),
            stride_m: other.stride_m.or(self.stride_m),
            elevation_gain_m: other.elevation_gain_m.or(self.elevation_gain_m),
            goal: other.goal.or(self.goal),
            goal_progress_pct: other.goal_progress_pct.or(self.goal_progress_pct),
            ghost_result: other.ghost_result.clone().or_else(|| self.ghost_result.clone()),
            auto_saved,
            migrated_from_carryover: self.migrated_from_carryover || other.migrated_from_carryover,
        }
    }
}
