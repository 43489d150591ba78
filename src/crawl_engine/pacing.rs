//! Per-source politeness pacing
//!
//! Every request to a target source is preceded by a randomized delay drawn
//! from that source's window. Concurrent requests to the same source are
//! spaced out: each reservation starts no earlier than the previous one plus
//! its own delay. Different sources never wait on each other.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::cancel::CancelToken;
use super::crawl_types::TargetSource;
use crate::config::{DelayRange, ManagerConfig};

#[derive(Debug)]
pub struct PolitenessPacer {
    windows: HashMap<TargetSource, DelayRange>,
    /// Latest reserved start time per source
    next_slot: Mutex<HashMap<TargetSource, Instant>>,
}

impl PolitenessPacer {
    #[must_use]
    pub fn from_config(config: &ManagerConfig) -> Self {
        let windows = TargetSource::ALL
            .iter()
            .map(|target| (*target, config.politeness(*target)))
            .collect();

        Self {
            windows,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Draw a delay uniformly from the source's window
    #[must_use]
    pub fn sample_delay(&self, target: TargetSource) -> Duration {
        let Some(range) = self.windows.get(&target) else {
            return Duration::ZERO;
        };
        if range.max <= range.min {
            return range.min;
        }
        let secs = rand::rng().random_range(range.min.as_secs_f64()..=range.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Reserve the next start time for `target`
    fn reserve(&self, target: TargetSource) -> Instant {
        let delay = self.sample_delay(target);
        let now = Instant::now();

        let mut slots = self.next_slot.lock();
        let ready = match slots.get(&target) {
            Some(last) if *last > now => *last + delay,
            _ => now + delay,
        };
        slots.insert(target, ready);
        ready
    }

    /// Wait until the caller may send its next request to `target`
    ///
    /// Returns false if cancelled while waiting.
    pub async fn wait(&self, target: TargetSource, cancel: &CancelToken) -> bool {
        let ready = self.reserve(target);
        if ready <= Instant::now() {
            return !cancel.is_cancelled();
        }

        let wait = ready - Instant::now();
        tracing::trace!(%target, ?wait, "Politeness delay");

        tokio::select! {
            () = tokio::time::sleep_until(ready) => !cancel.is_cancelled(),
            () = cancel.cancelled() => false,
        }
    }
}
