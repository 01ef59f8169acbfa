//! Exponential backoff for retryable upstream failures

use std::time::Duration;

/// Delay schedule for retrying rate-limited or transient requests
///
/// Attempt `n` (1-based) that fails waits `base * 2^(n-1)`, capped at `max`,
/// before attempt `n + 1`. No more than `max_attempts` requests are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
            max_attempts: 1,
        }
    }

    /// Delay to wait after failed attempt `attempt`, or `None` when attempts are exhausted
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts.max(1) {
            return None;
        }
        let exponent = (attempt - 1).min(31);
        let delay = self
            .base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max);
        Some(delay.min(self.max))
    }
}
