use serde::{Deserialize, Serialize};

/// Selects the sensor-fusion pipeline a session runs.
///
/// `Run` trusts GPS distance and a wall-clock active timer. `Walk` enables
/// the pedometer pipeline and lets step deltas advance the session clock
/// when GPS motion is absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Run,
    Walk,
}

impl Mode {
    /// Maximum plausible speed for this mode, in meters per second.
    ///
    /// Used by the `GeoFilter` speed gate; fixes above this are rejected
    /// as `excessive_speed` regardless of how the haversine distance works out.
    pub fn max_speed_mps(self) -> f64 {
        match self {
            Mode::Run => 11.1,
            Mode::Walk => 4.17,
        }
    }
}
