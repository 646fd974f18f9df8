use std::time::{Instant, SystemTime, UNIX_EPOCH};

use se_core::ports::ClockPort;

/// Wall-clock anchored, monotonic clock.
///
/// Readings start at the Unix time of construction and then advance with
/// `Instant`, so a system clock step never stretches or shortens a measured
/// window.
pub struct SystemClock {
    origin: Instant,
    origin_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        // A clock set before the epoch anchors at 0 rather than failing the flow.
        let origin_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        Self {
            origin: Instant::now(),
            origin_ms,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }
}
