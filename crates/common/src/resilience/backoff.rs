//! Capped exponential backoff for reconnect scheduling

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `delay(n) = min(max_delay, initial_delay * 2^n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentialBackoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self { initial_delay, max_delay }
    }

    pub fn from_millis(initial_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(initial_ms), Duration::from_millis(max_ms))
    }

    /// Delay before the reconnect attempt that follows `retry_count` earlier
    /// failures.
    pub fn calculate_delay(&self, retry_count: u32) -> Duration {
        let factor = 1u32 << retry_count.min(31);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from_millis(1_000, 30_000)
    }
}
