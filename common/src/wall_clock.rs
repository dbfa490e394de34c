/// A source of the current wall-clock time, expressed as Unix milliseconds.
///
/// The engine never reads the system clock directly: every timestamp it
/// acts on arrives as a field on an input event. This trait exists so the
/// collaborators that *generate* those events (the headless binary's
/// `Tick` producer, `AutoSaver`'s cadence) can be driven by a real clock in
/// production and a deterministic one in tests, mirroring the seam the
/// teacher codebase uses for its own elapsed-time measurements.
pub trait WallClock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// A [`WallClock`] backed by [`std::time::SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}
