use common::date_key::date_key_for_ts_ms;
use common::sensor::StepReading;

const DEFAULT_STRIDE_M: f32 = 0.75;
const STRIDE_ADAPT_MIN_STEPS: u32 = 10;
const STRIDE_ADAPT_MIN_SEGMENT_M: f64 = 10.0;
const STRIDE_ADAPT_MIN_OBSERVED_M: f64 = 0.4;
const STRIDE_ADAPT_MAX_OBSERVED_M: f64 = 1.2;
const STRIDE_ADAPT_EMA_ALPHA: f32 = 0.2;
/// Walk-mode active-time contribution per step, in meters per second (§4.2).
const STEP_TIME_COUPLING_MPS: f64 = 1.25;

/// The result of feeding one [`StepReading`] into a [`StepIntegrator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepUpdate {
    pub session_steps: u32,
    pub delta_steps: u32,
}

impl StepUpdate {
    /// The walk-mode active-time contribution of this reading's step delta (§4.2).
    pub fn active_time_ms(&self, stride_m: f32) -> i64 {
        ((self.delta_steps as f64 * stride_m as f64) / STEP_TIME_COUPLING_MPS * 1000.0).round() as i64
    }
}

/// Converts a monotonic device step counter into a reliable session step
/// count, absorbing sensor resets, pause intervals, and midnight rollover.
#[derive(Debug)]
pub struct StepIntegrator {
    stride_m: f32,
    base_counter: Option<u64>,
    paused_base: Option<u64>,
    session_steps_offset: u32,
    last_session_steps: u32,
    date_key: Option<String>,
}

impl StepIntegrator {
    pub fn new(initial_stride_m: Option<f32>) -> Self {
        StepIntegrator {
            stride_m: initial_stride_m.unwrap_or(DEFAULT_STRIDE_M),
            base_counter: None,
            paused_base: None,
            session_steps_offset: 0,
            last_session_steps: 0,
            date_key: None,
        }
    }

    pub fn stride_m(&self) -> f32 {
        self.stride_m
    }

    pub fn set_stride_m(&mut self, stride_m: f32) {
        self.stride_m = stride_m;
    }

    pub fn session_steps(&self) -> u32 {
        self.last_session_steps
    }

    /// Resets accumulation for a fresh or resumed session, keeping the
    /// stride estimate. `steps_offset` seeds from a carry-over snapshot.
    pub fn reset(&mut self, steps_offset: u32) {
        self.base_counter = None;
        self.paused_base = None;
        self.session_steps_offset = steps_offset;
        self.last_session_steps = steps_offset;
        self.date_key = None;
    }

    /// Marks the device counter's current value as the pause baseline, so
    /// steps accrued while paused are hidden from the session count on resume.
    pub fn on_paused(&mut self, raw_counter: u64) {
        self.paused_base = Some(raw_counter);
    }

    /// Feeds one reading while the session is Active, returning the session
    /// step count and the delta attributable to this reading. Returns
    /// `None` while paused (use [`StepIntegrator::on_paused`] instead).
    pub fn on_step_reading(&mut self, reading: StepReading) -> StepUpdate {
        if self.base_counter.is_none() || reading.raw_counter < self.base_counter.unwrap() {
            self.base_counter = Some(reading.raw_counter);
        }

        if let Some(paused_base) = self.paused_base.take() {
            if reading.raw_counter >= paused_base {
                self.base_counter = self
                    .base_counter
                    .map(|base| base + (reading.raw_counter - paused_base));
            }
        }

        let date_key = date_key_for_ts_ms(reading.ts_ms);
        match &self.date_key {
            Some(prev) if *prev != date_key => {
                let previous_base = self.base_counter.unwrap_or(reading.raw_counter);
                let midnight_delta = reading.raw_counter.saturating_sub(previous_base);
                self.session_steps_offset += midnight_delta as u32;
                self.base_counter = Some(reading.raw_counter);
            }
            _ => {}
        }
        self.date_key = Some(date_key);

        let base = self.base_counter.unwrap_or(reading.raw_counter);
        let raw_delta = reading.raw_counter.saturating_sub(base) as u32;
        let candidate = raw_delta + self.session_steps_offset;

        let session_steps = candidate.max(self.last_session_steps);
        let delta_steps = session_steps - self.last_session_steps;
        self.last_session_steps = session_steps;

        StepUpdate {
            session_steps,
            delta_steps,
        }
    }

    /// Updates the stride estimate from a GPS segment observed concurrently
    /// with a step delta, per the §4.2 EMA adaptation rule.
    pub fn adapt_stride(&mut self, segment_m: f64, step_delta: u32) {
        if step_delta < STRIDE_ADAPT_MIN_STEPS || segment_m < STRIDE_ADAPT_MIN_SEGMENT_M {
            return;
        }
        let observed = segment_m / step_delta as f64;
        if (STRIDE_ADAPT_MIN_OBSERVED_M..=STRIDE_ADAPT_MAX_OBSERVED_M).contains(&observed) {
            self.stride_m = 0.8 * self.stride_m + 0.2 * observed as f32;
        }
    }
}
