//! Exponential backoff between store retries

use std::time::Duration;

/// Geometric wait sequence bounded by a ceiling
///
/// `next_delay` hands out the current wait and doubles it for the next call,
/// never exceeding `ceiling`. Values are non-decreasing until `reset`.
#[derive(Debug, Clone)]
pub struct ExpBackoff {
    initial: Duration,
    ceiling: Duration,
    current: Duration,
}

impl ExpBackoff {
    /// Growth factor per failed attempt
    pub const FACTOR: u32 = 2;

    /// Create a backoff starting at `initial`
    ///
    /// An `initial` above `ceiling` is clamped to `ceiling`.
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        let initial = initial.min(ceiling);
        Self {
            initial,
            ceiling,
            current: initial,
        }
    }

    /// Return the current wait, then grow it
    pub fn next_delay(&mut self) -> Duration {
        let wait = self.current;
        self.current = self.current.saturating_mul(Self::FACTOR).min(self.ceiling);
        wait
    }

    /// Restore the wait to `initial`
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Wait the next call will return
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }
}

impl Iterator for ExpBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
