//! Exponential backoff with jitter for retries on the same layer
//!
//! Stateless: every call samples a fresh jitter factor, so two managers
//! sharing a policy never synchronize their retries.

use rand::Rng;
use std::time::Duration;

use super::errors::LayerError;
use crate::config::RetrySettings;

/// Lower bound of the multiplicative jitter
const JITTER_MIN: f64 = 0.8;
/// Upper bound of the multiplicative jitter
const JITTER_MAX: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(RetrySettings::default())
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay,
            max_delay: settings.max_delay,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt on the same layer is allowed after `attempt`
    /// (zero-based) failed
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// `min(base * 2^attempt * jitter, max)` with jitter in [0.8, 1.2]
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.scaled_delay(attempt, 1.0)
    }

    /// Backoff for `attempt` after a failure of class `error`
    ///
    /// Blocks back off twice as long and rate limits three times as long.
    /// A server supplied retry-after wins when it is longer, capped at the
    /// maximum delay.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &LayerError) -> Duration {
        let computed = self.scaled_delay(attempt, error.delay_multiplier());

        match error {
            LayerError::RateLimited {
                retry_after: Some(hint),
            } => computed.max((*hint).min(self.max_delay)),
            _ => computed,
        }
    }

    fn scaled_delay(&self, attempt: u32, multiplier: f64) -> Duration {
        // Clamp the exponent; 2^16 * base is far past any sane max_delay
        let exponent = attempt.min(16) as i32;
        let jitter = rand::rng().random_range(JITTER_MIN..=JITTER_MAX);
        let secs = self.base_delay.as_secs_f64() * 2f64.powi(exponent) * jitter * multiplier;

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
