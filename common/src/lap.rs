// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// A completed fixed-distance lap boundary.
///
/// `index` starts at 1 and laps are always produced in ascending order;
/// `pace_ms_per_km` is derived from `duration_ms`/`distance_m` at the
/// moment the boundary was crossed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub index: u32,
    pub distance_m: f64,
    pub duration_ms: i64,
    pub pace_ms_per_km: i64,
    pub cumulative_distance_m: f64,
    pub elapsed_ms: i64,
}
