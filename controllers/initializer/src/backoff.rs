//! # Fibonacci Backoff
//!
//! Restart pacing for watch sessions that died with a fatal error.
//! Grows more slowly than exponential backoff, so a flapping API server is
//! retried promptly at first without the controller hammering it forever.
//!
//! Default sequence with min=1s, max=60s: 1s, 1s, 2s, 3s, 5s, 8s, 13s, 21s,
//! 34s, 55s, 60s (capped). A max of zero disables pacing entirely, which
//! reproduces unconditional immediate reconnects.

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting from `min_seconds`
/// and capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_seconds: u64,
    /// Previous backoff value in seconds
    prev_seconds: u64,
    /// Current backoff value in seconds
    current_seconds: u64,
    /// Maximum backoff value in seconds; zero disables backoff
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given bounds in seconds.
    ///
    /// # Arguments
    ///
    /// * `min_seconds` - First two values of the sequence
    /// * `max_seconds` - Cap for the sequence; `0` disables backoff and
    ///   every call returns `Duration::ZERO`
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff duration and advance the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        if self.max_seconds == 0 {
            return Duration::ZERO;
        }

        let result = Duration::from_secs(self.current_seconds.min(self.max_seconds));

        let next_seconds = self.prev_seconds + self.current_seconds;
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next_seconds, self.max_seconds);

        result
    }

    /// Reset the backoff to the initial state, after a healthy session.
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}
