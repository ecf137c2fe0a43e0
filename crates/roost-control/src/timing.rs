use std::time::{Duration, Instant};

/// Monotonic elapsed-time gate. `ready` reports whether the interval has
/// passed since the last reset; the gate is reset only by its own user,
/// never by another gate firing on the same tick.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last: Instant,
}

impl RateGate {
    /// A new gate starts ready, so the first use is never delayed.
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last: now.checked_sub(interval).unwrap_or(now),
        }
    }

    pub fn ready(&self) -> bool {
        self.last.elapsed() >= self.interval
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}
