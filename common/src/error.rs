use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The engine's error taxonomy (§7).
///
/// These are surfaced as values (`ErrorObserved{kind, detail}`), never as
/// panics or unwinding exceptions — the event loop is infallible from the
/// caller's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ErrorKind {
    #[error("invalid_input")]
    InvalidInput,
    #[error("permission_denied")]
    PermissionDenied,
    #[error("stale_location")]
    StaleLocation,
    #[error("poor_accuracy")]
    PoorAccuracy,
    #[error("excessive_speed")]
    ExcessiveSpeed,
    #[error("stationary")]
    Stationary,
    #[error("below_threshold")]
    BelowThreshold,
    #[error("below_threshold_after_smoothing")]
    BelowThresholdAfterSmoothing,
    #[error("persistence_failed")]
    PersistenceFailed,
    #[error("state_violation")]
    StateViolation,
}

/// An error surfaced as an `ErrorObserved` event, carrying its kind and a
/// short human-readable detail string for logs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Error)]
#[error("{kind}: {detail}")]
pub struct EngineError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        EngineError {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::new(ErrorKind::PersistenceFailed, e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::new(ErrorKind::PersistenceFailed, e.to_string())
    }
}
