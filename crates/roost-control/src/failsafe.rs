use std::time::{Duration, Instant};

use crate::config::Mode;
use crate::values::MIN_CONTROL_VALUE;

/// How long the tracker may stay silent before the vehicle is considered
/// lost and driven to the stop command.
pub const MARKER_TIMEOUT: Duration = Duration::from_millis(2000);

/// Timeout-based degradation policy. Fires only while airborne under
/// automatic control; a grounded or manually flown vehicle is left alone.
#[derive(Debug)]
pub struct FailSafe {
    timeout: Duration,
}

impl FailSafe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// True when the published command must be forced to the stop sentinel
    /// this tick. Re-evaluated from scratch every cycle.
    pub fn should_force_stop(
        &self,
        mode: Mode,
        detected: bool,
        last_seen: Instant,
        throttle: i32,
    ) -> bool {
        mode == Mode::Automatic
            && !detected
            && last_seen.elapsed() >= self.timeout
            && throttle > MIN_CONTROL_VALUE
    }
}

impl Default for FailSafe {
    fn default() -> Self {
        Self::new(MARKER_TIMEOUT)
    }
}
