// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use algorithm::geo_filter::GeoFilterConfig;
use common::goal::GoalSpec;
use common::mode::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The engine's documented configuration surface (§4.12).
///
/// Bundles the session parameters the CLI exposes with the fixed algorithm
/// constants as named, documented fields instead of literals scattered
/// through `algorithm`'s source, so a config file or test can see and
/// override them without touching engine internals. [`EngineConfig::geo_filter_config`],
/// `max_history_items`, and `initial_stride_m` are what actually carry these
/// values into `GeoFilter`, `BlobStore`, and `StepIntegrator` at construction time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: Mode,
    pub goal: GoalSpec,
    pub lap_distance_m: f64,
    pub storage_root: PathBuf,

    pub max_history_items: usize,
    pub smoothing_window: usize,
    pub min_segment_m: f64,
    pub accuracy_threshold_m: f32,
    pub stale_threshold_ms: i64,
    /// Seeds `StepIntegrator`'s stride estimate (§4.2) instead of letting it
    /// start from the built-in default and adapt from scratch.
    pub initial_stride_m: Option<f32>,
    /// Documents Run mode's speed gate (§6). Walk mode's 4.17 m/s limit is
    /// derived from `Mode::max_speed_mps()`, not this field — the gate is
    /// inherently per-mode, so a single override here can't carry both.
    pub max_speed_mps: f64,
}

impl EngineConfig {
    /// The `GeoFilter` thresholds this config documents, ready to pass into
    /// `GeoFilter::new`.
    pub fn geo_filter_config(&self) -> GeoFilterConfig {
        GeoFilterConfig {
            accuracy_threshold_m: self.accuracy_threshold_m,
            stale_threshold_ms: self.stale_threshold_ms,
            min_segment_m: self.min_segment_m,
            smoothing_window: self.smoothing_window,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Run,
            goal: GoalSpec::None,
            lap_distance_m: 1_000.0,
            storage_root: PathBuf::from("."),
            max_history_items: 20,
            smoothing_window: 5,
            min_segment_m: 3.0,
            accuracy_threshold_m: 20.0,
            stale_threshold_ms: 120_000,
            initial_stride_m: None,
            max_speed_mps: 11.1,
        }
    }
}
