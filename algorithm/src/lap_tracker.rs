use common::lap::Lap;
use common::session_record::SessionRecord;

/// Fires lap completions at fixed cumulative-distance boundaries (§4.4).
///
/// Boundary crossings are interpolated against the previous distance/elapsed
/// update so that a single large distance jump still emits one `Lap` per
/// boundary crossed, keeping `laps.len() == floor(distance_m / lap_distance_m)`
/// an invariant rather than an approximation.
#[derive(Debug)]
pub struct LapTracker {
    lap_distance_m: f64,
    lap_target_m: f64,
    lap_start_distance_m: f64,
    lap_start_elapsed_ms: i64,
    previous_distance_m: f64,
    previous_elapsed_ms: i64,
    laps: Vec<Lap>,
}

impl LapTracker {
    pub fn new(lap_distance_m: f64) -> Self {
        LapTracker {
            lap_distance_m,
            lap_target_m: lap_distance_m,
            lap_start_distance_m: 0.0,
            lap_start_elapsed_ms: 0,
            previous_distance_m: 0.0,
            previous_elapsed_ms: 0,
            laps: Vec::new(),
        }
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn lap_distance_m(&self) -> f64 {
        self.lap_distance_m
    }

    /// Restores state from a carry-over snapshot's completed laps.
    pub fn restore(&mut self, laps: Vec<Lap>, distance_m: f64, elapsed_ms: i64) {
        self.lap_start_distance_m = distance_m;
        self.lap_start_elapsed_ms = elapsed_ms;
        self.lap_target_m = distance_m + self.lap_distance_m;
        self.previous_distance_m = distance_m;
        self.previous_elapsed_ms = elapsed_ms;
        self.laps = laps;
    }

    /// Feeds the session's current cumulative distance/elapsed time,
    /// returning every `Lap` boundary crossed since the previous call, in
    /// ascending index order.
    pub fn on_distance_update(&mut self, distance_m: f64, elapsed_ms: i64) -> Vec<Lap> {
        if self.lap_distance_m <= 0.0 {
            self.previous_distance_m = distance_m;
            self.previous_elapsed_ms = elapsed_ms;
            return Vec::new();
        }

        let mut emitted = Vec::new();
        let span_distance_m = distance_m - self.previous_distance_m;
        let span_elapsed_ms = elapsed_ms - self.previous_elapsed_ms;

        while distance_m >= self.lap_target_m {
            let boundary_elapsed_ms = if span_distance_m > 0.0 {
                let fraction = (self.lap_target_m - self.previous_distance_m) / span_distance_m;
                self.previous_elapsed_ms + (fraction * span_elapsed_ms as f64).round() as i64
            } else {
                elapsed_ms
            };

            let lap_distance_m = self.lap_target_m - self.lap_start_distance_m;
            let duration_ms = boundary_elapsed_ms - self.lap_start_elapsed_ms;
            let pace_ms_per_km = SessionRecord::compute_avg_pace_ms_per_km(lap_distance_m, duration_ms);

            let lap = Lap {
                index: self.laps.len() as u32 + 1,
                distance_m: lap_distance_m,
                duration_ms,
                pace_ms_per_km,
                cumulative_distance_m: self.lap_target_m,
                elapsed_ms: boundary_elapsed_ms,
            };
            self.laps.push(lap);
            emitted.push(lap);

            self.lap_start_distance_m = self.lap_target_m;
            self.lap_start_elapsed_ms = boundary_elapsed_ms;
            self.lap_target_m += self.lap_distance_m;
        }

        self.previous_distance_m = distance_m;
        self.previous_elapsed_ms = elapsed_ms;
        emitted
    }
}
