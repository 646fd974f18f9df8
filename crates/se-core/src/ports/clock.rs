pub trait ClockPort: Send + Sync {
    /// Milliseconds since the Unix epoch. Must never go backwards; the
    /// decryption retry window only compares readings.
    fn now_ms(&self) -> i64;
}
