use serde::{Deserialize, Serialize};

/// A one-shot goal the session is tracked against.
///
/// `None` disables `GoalWatcher` entirely; `Distance`/`Time` trip exactly
/// once for the lifetime of a session (see `GoalWatcher`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GoalSpec {
    Distance(u32),
    Time(u64),
    None,
}

impl GoalSpec {
    /// The distance hint used to pick a ghost target, if this goal implies one.
    pub fn distance_hint_m(&self) -> Option<f64> {
        match self {
            GoalSpec::Distance(m) => Some(*m as f64),
            _ => None,
        }
    }
}

impl Default for GoalSpec {
    fn default() -> Self {
        GoalSpec::None
    }
}
