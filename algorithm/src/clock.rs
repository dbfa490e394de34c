use common::mode::Mode;

/// How long a "moving hint" (accepted GPS segment or step delta) keeps the
/// walk-regime clock ticking with wall-clock time between events (§4.3).
const MOVING_WINDOW_MS: i64 = 5_000;

/// Tracks active elapsed time for a session, diverging by [`Mode`]: `Run`
/// is wall-clock minus paused intervals; `Walk` is an accumulator fed by
/// step-time coupling and wall-clock ticks while recent motion is observed.
#[derive(Debug)]
pub struct SessionClock {
    mode: Mode,
    elapsed_offset_ms: i64,
    is_paused: bool,
    started_at_ms: i64,
    paused_total_ms: i64,
    pause_started_at_ms: Option<i64>,
    active_accumulator_ms: i64,
    last_tick_ms: i64,
    last_moving_ms: Option<i64>,
}

impl SessionClock {
    pub fn new(mode: Mode) -> Self {
        SessionClock {
            mode,
            elapsed_offset_ms: 0,
            is_paused: false,
            started_at_ms: 0,
            paused_total_ms: 0,
            pause_started_at_ms: None,
            active_accumulator_ms: 0,
            last_tick_ms: 0,
            last_moving_ms: None,
        }
    }

    /// Starts or resumes-from-carry-over a session clock at `now_ms`,
    /// seeding accumulated time from a prior session's `elapsed_offset_ms`.
    pub fn start(&mut self, now_ms: i64, elapsed_offset_ms: i64) {
        self.elapsed_offset_ms = elapsed_offset_ms;
        self.is_paused = false;
        self.started_at_ms = now_ms;
        self.paused_total_ms = 0;
        self.pause_started_at_ms = None;
        self.active_accumulator_ms = 0;
        self.last_tick_ms = now_ms;
        self.last_moving_ms = None;
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Freezes the clock. Flushes the walk-regime accumulator first so no
    /// fractional second of motion is lost at the pause boundary.
    pub fn pause(&mut self, now_ms: i64) {
        if self.mode == Mode::Walk {
            self.tick_walk(now_ms);
        }
        self.is_paused = true;
        self.pause_started_at_ms = Some(now_ms);
    }

    /// Resumes the clock, folding the paused interval into the run-regime
    /// total so elapsed time never counts time spent paused.
    pub fn resume(&mut self, now_ms: i64) {
        if self.mode == Mode::Run {
            if let Some(paused_at) = self.pause_started_at_ms.take() {
                self.paused_total_ms += now_ms - paused_at;
            }
        } else {
            self.pause_started_at_ms = None;
        }
        self.is_paused = false;
        self.last_tick_ms = now_ms;
    }

    /// Records that motion was observed at `now_ms`, either an accepted GPS
    /// segment or a step delta. Used by the walk regime's wall-clock ticker.
    pub fn on_moving_hint(&mut self, now_ms: i64) {
        self.last_moving_ms = Some(now_ms);
    }

    /// Adds a direct active-time contribution (walk-mode step-time
    /// coupling, §4.2). A no-op in the run regime or while paused.
    pub fn add_active_ms(&mut self, delta_ms: i64) {
        if self.mode == Mode::Walk && !self.is_paused {
            self.active_accumulator_ms += delta_ms;
        }
    }

    /// Advances the clock to `now_ms` and returns the current elapsed time.
    pub fn on_tick(&mut self, now_ms: i64) -> i64 {
        if !self.is_paused && self.mode == Mode::Walk {
            self.tick_walk(now_ms);
        }
        self.elapsed_ms(now_ms)
    }

    fn tick_walk(&mut self, now_ms: i64) {
        if let Some(last_moving) = self.last_moving_ms
            && now_ms - last_moving <= MOVING_WINDOW_MS
        {
            self.active_accumulator_ms += now_ms - self.last_tick_ms;
        }
        self.last_tick_ms = now_ms;
    }

    /// The current elapsed time without advancing any internal state.
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        match self.mode {
            Mode::Run => {
                let paused_ms = self.paused_total_ms
                    + self
                        .pause_started_at_ms
                        .map(|paused_at| now_ms - paused_at)
                        .unwrap_or(0);
                (now_ms - self.started_at_ms - paused_ms + self.elapsed_offset_ms).max(0)
            }
            Mode::Walk => self.active_accumulator_ms + self.elapsed_offset_ms,
        }
    }
}
