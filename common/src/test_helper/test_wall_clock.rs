use crate::wall_clock::WallClock;
use std::sync::atomic::{AtomicI64, Ordering};

/// A test implementation of [`WallClock`] that allows deterministic control
/// of "now" in unit tests, mirroring `ElapsedTestTimeSource`'s role in the
/// teacher codebase.
#[derive(Debug, Default)]
pub struct TestWallClock {
    now_ms: AtomicI64,
}

impl TestWallClock {
    pub fn new(start_ms: i64) -> Self {
        TestWallClock {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl WallClock for TestWallClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
