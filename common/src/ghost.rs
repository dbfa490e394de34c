use serde::{Deserialize, Serialize};

/// A single control point on a ghost target's distance/time curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostPoint {
    pub cumulative_distance_m: f64,
    pub elapsed_ms: i64,
}

/// A past session replayed as a pacer.
///
/// `points` must be strictly increasing in both dimensions; the engine
/// interpolates linearly between adjacent points and clamps to the last
/// point outside the target's range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostTarget {
    pub id: String,
    pub points: Vec<GhostPoint>,
}

impl GhostTarget {
    /// The distance, in meters, covered by the longest point in this target.
    pub fn max_distance_m(&self) -> f64 {
        self.points
            .last()
            .map(|p| p.cumulative_distance_m)
            .unwrap_or(0.0)
    }

    /// The duration, in milliseconds, of this target's full distance.
    pub fn total_duration_ms(&self) -> i64 {
        self.points.last().map(|p| p.elapsed_ms).unwrap_or(0)
    }

    /// Linearly interpolates this target's elapsed time at `distance_m`.
    ///
    /// Clamps to the first/last control point outside `[0, max_distance_m]`.
    pub fn elapsed_at_distance(&self, distance_m: f64) -> Option<i64> {
        if self.points.is_empty() {
            return None;
        }
        if distance_m <= self.points[0].cumulative_distance_m {
            return Some(self.points[0].elapsed_ms);
        }
        for window in self.points.windows(2) {
            let (a, b) = (window[0], window[1]);
            if distance_m >= a.cumulative_distance_m && distance_m <= b.cumulative_distance_m {
                let span = b.cumulative_distance_m - a.cumulative_distance_m;
                if span <= 0.0 {
                    return Some(a.elapsed_ms);
                }
                let t = (distance_m - a.cumulative_distance_m) / span;
                let interpolated =
                    a.elapsed_ms as f64 + t * (b.elapsed_ms - a.elapsed_ms) as f64;
                return Some(interpolated.round() as i64);
            }
        }
        Some(self.points.last().unwrap().elapsed_ms)
    }
}

/// Outcome of a ghost-mode session, attached to the `SessionRecord` on end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostResult {
    pub target_id: String,
    pub target_distance_m: f64,
    pub target_duration_ms: i64,
    pub success: bool,
    pub diff_seconds: i32,
}
