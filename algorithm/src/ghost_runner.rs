use common::ghost::{GhostResult, GhostTarget};
use std::sync::Arc;

/// One kilometre-mark comparison against a ghost target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostDelta {
    pub km: u32,
    pub diff_seconds: i32,
}

/// Replays a past session as a pacer, emitting a [`GhostDelta`] at each
/// kilometre mark and a final [`GhostResult`] on session end (§4.5).
#[derive(Debug)]
pub struct GhostRunner {
    target: Arc<GhostTarget>,
    next_km_index: u32,
    max_km_index: u32,
    goal_completed: bool,
}

impl GhostRunner {
    pub fn new(target: Arc<GhostTarget>) -> Self {
        let max_km_index = (target.max_distance_m() / 1000.0).ceil() as u32 + 1;
        GhostRunner {
            target,
            next_km_index: 1,
            max_km_index,
            goal_completed: false,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target.id
    }

    /// The goal attached to this session was reached; affects [`GhostResult::success`].
    pub fn mark_goal_completed(&mut self) {
        self.goal_completed = true;
    }

    /// Feeds the session's current cumulative distance/elapsed, returning
    /// every kilometre-mark delta crossed since the previous call.
    pub fn on_distance_update(&mut self, distance_m: f64, elapsed_ms: i64) -> Vec<GhostDelta> {
        let mut emitted = Vec::new();
        while self.next_km_index <= self.max_km_index
            && distance_m >= (self.next_km_index as f64) * 1000.0
        {
            let target_distance_m = (self.next_km_index as f64) * 1000.0;
            if let Some(target_elapsed_ms) = self.target.elapsed_at_distance(target_distance_m) {
                let diff_seconds =
                    ((elapsed_ms - target_elapsed_ms) as f64 / 1000.0).round() as i32;
                emitted.push(GhostDelta {
                    km: self.next_km_index,
                    diff_seconds,
                });
            }
            self.next_km_index += 1;
        }
        emitted
    }

    /// Finalizes the ghost comparison at session end.
    pub fn finish(&self, distance_m: f64, elapsed_ms: i64) -> GhostResult {
        let target_elapsed_ms = self
            .target
            .elapsed_at_distance(distance_m)
            .unwrap_or(elapsed_ms);
        let diff_seconds = ((elapsed_ms - target_elapsed_ms) as f64 / 1000.0).round() as i32;
        GhostResult {
            target_id: self.target.id.clone(),
            target_distance_m: self.target.max_distance_m(),
            target_duration_ms: self.target.total_duration_ms(),
            success: self.goal_completed && diff_seconds < 0,
            diff_seconds,
        }
    }
}

/// Picks a ghost target from `candidates` (§4.5 Selection).
///
/// Prefers a target within 500 m of `hint_distance_m` (from a distance
/// goal); among equally-eligible targets, picks the shortest duration.
/// A target with an empty `points` timeline is never eligible.
pub fn select_target<'a>(
    candidates: &'a [GhostTarget],
    hint_distance_m: Option<f64>,
) -> Option<&'a GhostTarget> {
    let eligible: Vec<&GhostTarget> = candidates.iter().filter(|t| !t.points.is_empty()).collect();
    if eligible.is_empty() {
        return None;
    }
    if let Some(hint) = hint_distance_m {
        let within_range: Vec<&GhostTarget> = eligible
            .iter()
            .copied()
            .filter(|t| (t.max_distance_m() - hint).abs() <= 500.0)
            .collect();
        if !within_range.is_empty() {
            return within_range.into_iter().min_by_key(|t| t.total_duration_ms());
        }
    }
    eligible.into_iter().min_by_key(|t| t.total_duration_ms())
}
