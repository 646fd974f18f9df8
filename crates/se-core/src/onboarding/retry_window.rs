//! Decryption retry window.
//!
//! A meter that just received new keys can report `DecryptionError` for a
//! while before the keys take effect. The window measures how long the error
//! has persisted across consecutive polls.

use serde::Serialize;
use std::time::Duration;

/// Outcome of feeding one `DecryptionError` observation into the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryWindowVerdict {
    /// First occurrence; the window opened now.
    Started,
    /// Still inside the window.
    Waiting { elapsed_ms: i64 },
    /// The error outlived the window.
    TimedOut { elapsed_ms: i64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecryptionRetryWindow {
    started_at_ms: Option<i64>,
}

impl DecryptionRetryWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    pub fn is_open(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Record a `DecryptionError` seen at `now_ms`.
    ///
    /// Times out once `now_ms - start >= timeout`.
    pub fn observe(&mut self, now_ms: i64, timeout: Duration) -> RetryWindowVerdict {
        let Some(started_at) = self.started_at_ms else {
            self.started_at_ms = Some(now_ms);
            return RetryWindowVerdict::Started;
        };

        let elapsed_ms = now_ms.saturating_sub(started_at);
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        if elapsed_ms >= timeout_ms {
            RetryWindowVerdict::TimedOut { elapsed_ms }
        } else {
            RetryWindowVerdict::Waiting { elapsed_ms }
        }
    }

    /// Any snapshot that is not a `DecryptionError` closes the window.
    pub fn reset(&mut self) {
        self.started_at_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(180);

    #[test]
    fn first_observation_opens_window_without_timing_out() {
        let mut window = DecryptionRetryWindow::new();
        assert_eq!(window.observe(5_000, TIMEOUT), RetryWindowVerdict::Started);
        assert_eq!(window.started_at_ms(), Some(5_000));
    }

    #[test]
    fn observation_after_181_seconds_times_out() {
        let mut window = DecryptionRetryWindow::new();
        window.observe(0, TIMEOUT);
        assert_eq!(
            window.observe(181_000, TIMEOUT),
            RetryWindowVerdict::TimedOut { elapsed_ms: 181_000 }
        );
    }

    #[test]
    fn observation_inside_window_keeps_waiting() {
        let mut window = DecryptionRetryWindow::new();
        window.observe(0, TIMEOUT);
        assert_eq!(
            window.observe(179_999, TIMEOUT),
            RetryWindowVerdict::Waiting { elapsed_ms: 179_999 }
        );
        assert_eq!(
            window.observe(180_000, TIMEOUT),
            RetryWindowVerdict::TimedOut { elapsed_ms: 180_000 }
        );
    }

    #[test]
    fn reset_restarts_measurement_from_next_occurrence() {
        let mut window = DecryptionRetryWindow::new();
        window.observe(0, TIMEOUT);
        window.reset();
        assert!(!window.is_open());

        assert_eq!(window.observe(181_000, TIMEOUT), RetryWindowVerdict::Started);
        assert_eq!(
            window.observe(200_000, TIMEOUT),
            RetryWindowVerdict::Waiting { elapsed_ms: 19_000 }
        );
    }
}
