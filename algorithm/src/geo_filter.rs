use common::mode::Mode;
use common::sensor::LocationFix;
use std::collections::{HashMap, VecDeque};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const NO_ACCURACY_RAW_CAP_M: f64 = 6.0;
const STATIONARY_SPEED_MPS: f64 = 0.5;
const STATIONARY_STREAK: u32 = 3;

/// The tunable thresholds from §4.1/§4.12, collected so a config file or a
/// test can override them without touching `GeoFilter` internals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoFilterConfig {
    pub accuracy_threshold_m: f32,
    pub stale_threshold_ms: i64,
    pub min_segment_m: f64,
    pub smoothing_window: usize,
}

impl Default for GeoFilterConfig {
    fn default() -> Self {
        GeoFilterConfig {
            accuracy_threshold_m: 20.0,
            stale_threshold_ms: 120_000,
            min_segment_m: 3.0,
            smoothing_window: 5,
        }
    }
}

/// Why a fix was accepted or rejected by [`GeoFilter::on_location`] (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixOutcome {
    FirstLocation,
    Accepted,
    Invalid,
    PoorAccuracy,
    StaleLocation,
    InvalidTime,
    ExcessiveSpeed,
    Stationary,
    BelowThreshold,
    BelowThresholdAfterSmoothing,
}

/// The result of feeding one [`LocationFix`] into a [`GeoFilter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationUpdate {
    pub accepted: bool,
    pub delta_m: f64,
    pub reason: FixOutcome,
    pub anchor_updated: bool,
}

#[derive(Clone, Copy, Debug)]
struct Anchor {
    lat: f64,
    lon: f64,
    ts_ms: i64,
}

/// Validates and smooths a stream of raw [`LocationFix`]es, accumulating
/// accepted segment distance while rejecting GPS drift and noise (§4.1).
#[derive(Debug)]
pub struct GeoFilter {
    mode: Mode,
    config: GeoFilterConfig,
    anchor: Option<Anchor>,
    total_distance_m: f64,
    smoothing_buffer: VecDeque<LocationFix>,
    consecutive_slow: u32,
    reject_counters: HashMap<FixOutcome, u32>,
}

impl GeoFilter {
    pub fn new(mode: Mode, config: GeoFilterConfig) -> Self {
        GeoFilter {
            mode,
            smoothing_buffer: VecDeque::with_capacity(config.smoothing_window),
            config,
            anchor: None,
            total_distance_m: 0.0,
            consecutive_slow: 0,
            reject_counters: HashMap::new(),
        }
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Resets accumulated distance and clears the anchor, forcing the next
    /// fix to be treated as a fresh first location. Used on resume from a
    /// carry-over or when resuming from a paused session.
    pub fn reset(&mut self, initial_distance: f64) {
        self.total_distance_m = initial_distance;
        self.anchor = None;
        self.smoothing_buffer.clear();
        self.consecutive_slow = 0;
    }

    pub fn reject_count(&self, reason: FixOutcome) -> u32 {
        *self.reject_counters.get(&reason).unwrap_or(&0)
    }

    fn reject(&mut self, reason: FixOutcome, anchor_updated: bool) -> LocationUpdate {
        *self.reject_counters.entry(reason).or_insert(0) += 1;
        LocationUpdate {
            accepted: false,
            delta_m: 0.0,
            reason,
            anchor_updated,
        }
    }

    fn set_anchor(&mut self, lat: f64, lon: f64, ts_ms: i64) {
        self.anchor = Some(Anchor { lat, lon, ts_ms });
    }

    /// Processes one fix, returning whether it was accepted and by how much
    /// the cumulative distance grew.
    pub fn on_location(&mut self, fix: LocationFix, now_ms: i64) -> LocationUpdate {
        if !fix.is_valid() {
            return self.reject(FixOutcome::Invalid, false);
        }

        let accuracy_ok = fix.accuracy_m.is_none_or(|a| a <= self.config.accuracy_threshold_m);
        if !accuracy_ok {
            return self.reject(FixOutcome::PoorAccuracy, false);
        }

        let stale = now_ms.saturating_sub(fix.ts_ms) > self.config.stale_threshold_ms;
        if stale {
            return self.reject(FixOutcome::StaleLocation, false);
        }

        let Some(anchor) = self.anchor else {
            self.set_anchor(fix.lat, fix.lon, fix.ts_ms);
            self.smoothing_buffer.clear();
            self.smoothing_buffer.push_back(fix);
            self.consecutive_slow = 0;
            *self.reject_counters.entry(FixOutcome::FirstLocation).or_insert(0) += 1;
            return LocationUpdate {
                accepted: true,
                delta_m: 0.0,
                reason: FixOutcome::FirstLocation,
                anchor_updated: true,
            };
        };

        let delta_t_ms = fix.ts_ms - anchor.ts_ms;
        if delta_t_ms <= 0 {
            return self.reject(FixOutcome::InvalidTime, false);
        }

        let mut raw_m = haversine_m(anchor.lat, anchor.lon, fix.lat, fix.lon);
        if fix.accuracy_m.is_none() {
            raw_m = raw_m.min(NO_ACCURACY_RAW_CAP_M);
        }

        let speed_mps = raw_m / (delta_t_ms as f64 / 1000.0);
        if !(0.0..=self.mode.max_speed_mps()).contains(&speed_mps) {
            return self.reject(FixOutcome::ExcessiveSpeed, false);
        }

        if speed_mps < STATIONARY_SPEED_MPS {
            self.consecutive_slow += 1;
        } else {
            self.consecutive_slow = 0;
        }
        if self.consecutive_slow >= STATIONARY_STREAK {
            self.set_anchor(fix.lat, fix.lon, fix.ts_ms);
            return self.reject(FixOutcome::Stationary, true);
        }

        if self.smoothing_buffer.len() == self.config.smoothing_window {
            self.smoothing_buffer.pop_front();
        }
        self.smoothing_buffer.push_back(fix);

        if raw_m < self.config.min_segment_m {
            self.set_anchor(fix.lat, fix.lon, fix.ts_ms);
            return self.reject(FixOutcome::BelowThreshold, true);
        }

        let (smoothed_lat, smoothed_lon, smoothed_ts_ms) = weighted_average(&self.smoothing_buffer);
        let smoothed_delta_m = haversine_m(anchor.lat, anchor.lon, smoothed_lat, smoothed_lon);

        if smoothed_delta_m < self.config.min_segment_m {
            self.set_anchor(smoothed_lat, smoothed_lon, smoothed_ts_ms);
            return self.reject(FixOutcome::BelowThresholdAfterSmoothing, true);
        }

        self.total_distance_m += smoothed_delta_m;
        self.set_anchor(smoothed_lat, smoothed_lon, smoothed_ts_ms);
        *self.reject_counters.entry(FixOutcome::Accepted).or_insert(0) += 1;
        LocationUpdate {
            accepted: true,
            delta_m: smoothed_delta_m,
            reason: FixOutcome::Accepted,
            anchor_updated: true,
        }
    }
}

/// Linearly-weighted average of the points in `buffer`, weights `1..=len`
/// assigned oldest-to-newest so the most recent fix carries the most
/// influence over the smoothed position.
///
/// The timestamp is averaged with the same weights so the smoothed anchor's
/// `ts_ms` stays consistent with how lagged its position is — anchoring a
/// smoothed (lagged) position to the newest fix's timestamp would shrink
/// `delta_t_ms` on the next fix without shrinking the matching distance,
/// inflating the computed speed until the gate rejects everything.
fn weighted_average(buffer: &VecDeque<LocationFix>) -> (f64, f64, i64) {
    let mut weight_sum = 0.0;
    let mut lat_sum = 0.0;
    let mut lon_sum = 0.0;
    let mut ts_sum = 0.0;
    for (i, fix) in buffer.iter().enumerate() {
        let weight = (i + 1) as f64;
        weight_sum += weight;
        lat_sum += weight * fix.lat;
        lon_sum += weight * fix.lon;
        ts_sum += weight * fix.ts_ms as f64;
    }
    (lat_sum / weight_sum, lon_sum / weight_sum, (ts_sum / weight_sum).round() as i64)
}

/// Great-circle distance between two points, in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1_r, lat2_r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}
