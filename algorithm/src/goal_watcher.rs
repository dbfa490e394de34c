use common::goal::GoalSpec;

/// The payload for a one-shot goal trip (§4.6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoalReached {
    pub goal: GoalSpec,
    pub elapsed_ms: i64,
    pub distance_m: f64,
    pub avg_pace_ms_per_km: i64,
}

/// Watches a session's progress against a [`GoalSpec`] and fires exactly
/// once for the lifetime of a session.
#[derive(Debug)]
pub struct GoalWatcher {
    goal: GoalSpec,
    reached: bool,
}

impl GoalWatcher {
    pub fn new(goal: GoalSpec) -> Self {
        GoalWatcher {
            goal,
            reached: false,
        }
    }

    pub fn goal(&self) -> GoalSpec {
        self.goal
    }

    pub fn reached(&self) -> bool {
        self.reached
    }

    /// Checks whether `distance_m`/`elapsed_ms` trips the goal, latching so
    /// every subsequent call returns `None` regardless of further progress.
    pub fn check(
        &mut self,
        distance_m: f64,
        elapsed_ms: i64,
        avg_pace_ms_per_km: i64,
    ) -> Option<GoalReached> {
        if self.reached {
            return None;
        }
        let tripped = match self.goal {
            GoalSpec::Distance(meters) => distance_m >= meters as f64,
            GoalSpec::Time(millis) => elapsed_ms >= millis as i64,
            GoalSpec::None => false,
        };
        if !tripped {
            return None;
        }
        self.reached = true;
        Some(GoalReached {
            goal: self.goal,
            elapsed_ms,
            distance_m,
            avg_pace_ms_per_km,
        })
    }
}
