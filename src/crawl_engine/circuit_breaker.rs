//! Circuit breaker pattern for layer-level failure detection
//!
//! Tracks the health of each acquisition layer and takes consistently failing
//! layers out of rotation for a per-kind cooldown.
//!
//! The circuit breaker tracks layer health across three states:
//! - Closed: Normal operation, requests proceed
//! - Open: Too many failures, the layer is skipped
//! - `HalfOpen`: Cooldown elapsed, one trial request decides the next state

use dashmap::DashMap;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

use super::crawl_types::{AttemptOutcome, CircuitState, LayerKind, LayerSelector};
use super::errors::{ManagerError, ManagerResult};
use crate::config::{LayerProfile, ManagerConfig};

/// Health tracking for a single layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerHealth {
    /// Weighted count of failures since the last success
    pub consecutive_failures: u32,
    /// Total number of attempts recorded
    pub total_attempts: u32,
    /// Total number of successful attempts
    pub total_successes: u32,
    /// Last time the layer answered successfully
    pub last_success: Option<Instant>,
    /// Time the circuit was last opened (cooldown reference)
    pub opened_at: Option<Instant>,
    /// Current circuit breaker state
    pub state: CircuitState,
}

impl LayerHealth {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            total_attempts: 0,
            total_successes: 0,
            last_success: None,
            opened_at: None,
            state: CircuitState::Closed,
        }
    }
}

/// Serializable circuit view of one layer, for metrics reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Seconds until an Open circuit admits a trial request
    pub cooldown_remaining_secs: Option<f64>,
}

/// Thresholds the breaker applies to one layer kind
#[derive(Debug, Clone, Copy)]
struct BreakerPolicy {
    max_failures: u32,
    cooldown: Duration,
    block_penalty: u32,
}

impl From<LayerProfile> for BreakerPolicy {
    fn from(profile: LayerProfile) -> Self {
        Self {
            max_failures: profile.max_failures,
            cooldown: profile.cooldown,
            block_penalty: profile.block_penalty,
        }
    }
}

/// Circuit breaker keyed by layer kind
///
/// Only kinds passed at construction are known; any other kind is an
/// `InvalidLayer` error.
pub struct CircuitBreaker {
    layers: DashMap<LayerKind, LayerHealth>,
    policies: HashMap<LayerKind, BreakerPolicy>,
}

impl CircuitBreaker {
    /// Create a breaker for the given kinds and their profiles
    #[must_use]
    pub fn new(profiles: impl IntoIterator<Item = (LayerKind, LayerProfile)>) -> Self {
        let policies: HashMap<LayerKind, BreakerPolicy> = profiles
            .into_iter()
            .map(|(kind, profile)| (kind, BreakerPolicy::from(profile)))
            .collect();
        let layers = policies
            .keys()
            .map(|kind| (*kind, LayerHealth::new()))
            .collect();

        Self { layers, policies }
    }

    /// Create a breaker for `kinds` using the profiles from `config`
    #[must_use]
    pub fn from_config(config: &ManagerConfig, kinds: impl IntoIterator<Item = LayerKind>) -> Self {
        Self::new(kinds.into_iter().map(|kind| (kind, config.profile(kind))))
    }

    fn policy(&self, kind: LayerKind) -> ManagerResult<BreakerPolicy> {
        self.policies
            .get(&kind)
            .copied()
            .ok_or(ManagerError::InvalidLayer(kind))
    }

    /// Check whether the layer may receive a request
    ///
    /// True for Closed and `HalfOpen`. An Open circuit whose cooldown has
    /// elapsed moves to `HalfOpen` here.
    pub fn is_available(&self, kind: LayerKind) -> ManagerResult<bool> {
        let policy = self.policy(kind)?;
        let mut health = self
            .layers
            .get_mut(&kind)
            .ok_or(ManagerError::InvalidLayer(kind))?;

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(true),
            CircuitState::Open => {
                if let Some(opened) = health.opened_at {
                    if opened.elapsed() >= policy.cooldown {
                        health.state = CircuitState::HalfOpen;
                        info!(
                            "Circuit breaker transitioning to HALF-OPEN for layer: {} (after {:?} cooldown)",
                            kind,
                            opened.elapsed()
                        );
                        return Ok(true);
                    }
                } else {
                    // Conservatively stay Open to avoid bypassing the cooldown
                    debug!("Circuit breaker OPEN with no timestamp for layer: {kind}, staying Open");
                }
                Ok(false)
            }
        }
    }

    /// Record the result of one attempt
    ///
    /// Returns the circuit state after the transition.
    pub fn record(&self, kind: LayerKind, success: bool, blocked: bool) -> ManagerResult<CircuitState> {
        if success {
            self.record_success(kind)
        } else {
            self.record_failure(kind, blocked)
        }
    }

    /// Record an attempt outcome built by the manager
    pub fn record_outcome(&self, outcome: &AttemptOutcome) -> ManagerResult<CircuitState> {
        self.record(outcome.layer, outcome.success, outcome.blocked)
    }

    fn record_success(&self, kind: LayerKind) -> ManagerResult<CircuitState> {
        let mut health = self
            .layers
            .get_mut(&kind)
            .ok_or(ManagerError::InvalidLayer(kind))?;

        health.consecutive_failures = 0;
        health.total_successes += 1;
        health.total_attempts += 1;
        health.last_success = Some(Instant::now());

        if health.state != CircuitState::Closed {
            health.state = CircuitState::Closed;
            health.opened_at = None;
            info!("Circuit breaker CLOSED for layer: {kind}");
        }

        Ok(health.state)
    }

    fn record_failure(&self, kind: LayerKind, blocked: bool) -> ManagerResult<CircuitState> {
        let policy = self.policy(kind)?;
        let mut health = self
            .layers
            .get_mut(&kind)
            .ok_or(ManagerError::InvalidLayer(kind))?;

        let weight = if blocked { policy.block_penalty } else { 1 };
        health.consecutive_failures = health.consecutive_failures.saturating_add(weight);
        health.total_attempts += 1;

        match health.state {
            CircuitState::HalfOpen => {
                health.state = CircuitState::Open;
                health.opened_at = Some(Instant::now());
                warn!(
                    "Circuit breaker RE-OPENED for layer {} after failed trial request (blocked: {})",
                    kind, blocked
                );
            }
            CircuitState::Closed if health.consecutive_failures >= policy.max_failures => {
                health.state = CircuitState::Open;
                health.opened_at = Some(Instant::now());
                warn!(
                    "Circuit breaker OPEN for layer {} after {} consecutive failures (cooldown {:?})",
                    kind, health.consecutive_failures, policy.cooldown
                );
            }
            CircuitState::Closed => {
                debug!(
                    "Circuit breaker failure for layer: {} ({}/{}, blocked: {})",
                    kind, health.consecutive_failures, policy.max_failures, blocked
                );
            }
            CircuitState::Open => {
                debug!("Circuit breaker failure recorded while OPEN for layer: {kind}");
            }
        }

        Ok(health.state)
    }

    /// Get health statistics for a layer
    pub fn status(&self, kind: LayerKind) -> ManagerResult<LayerHealth> {
        self.layers
            .get(&kind)
            .map(|entry| entry.value().clone())
            .ok_or(ManagerError::InvalidLayer(kind))
    }

    /// Time left before an Open circuit becomes eligible for a trial request
    pub fn cooldown_remaining(&self, kind: LayerKind) -> ManagerResult<Option<Duration>> {
        let policy = self.policy(kind)?;
        let health = self.status(kind)?;
        Ok(remaining_cooldown(&policy, &health))
    }

    /// Forget the recorded health of one layer or all layers
    pub fn reset(&self, selector: LayerSelector) -> ManagerResult<()> {
        match selector {
            LayerSelector::One(kind) => {
                let mut health = self
                    .layers
                    .get_mut(&kind)
                    .ok_or(ManagerError::InvalidLayer(kind))?;
                *health = LayerHealth::new();
                info!("Circuit breaker RESET for layer: {kind}");
            }
            LayerSelector::All => {
                for mut entry in self.layers.iter_mut() {
                    *entry.value_mut() = LayerHealth::new();
                }
                info!("Circuit breaker RESET for all layers");
            }
        }
        Ok(())
    }

    /// Layers currently in Open state
    #[must_use]
    pub fn open_layers(&self) -> Vec<LayerKind> {
        let mut open: Vec<LayerKind> = self
            .layers
            .iter()
            .filter(|entry| entry.value().state == CircuitState::Open)
            .map(|entry| *entry.key())
            .collect();
        open.sort();
        open
    }

    /// Circuit view of every known layer
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<LayerKind, CircuitSnapshot> {
        self.layers
            .iter()
            .map(|entry| {
                let kind = *entry.key();
                let health = entry.value();
                let cooldown_remaining_secs = self
                    .policies
                    .get(&kind)
                    .and_then(|policy| remaining_cooldown(policy, health))
                    .map(|left| left.as_secs_f64());
                (
                    kind,
                    CircuitSnapshot {
                        state: health.state,
                        consecutive_failures: health.consecutive_failures,
                        cooldown_remaining_secs,
                    },
                )
            })
            .collect()
    }
}

fn remaining_cooldown(policy: &BreakerPolicy, health: &LayerHealth) -> Option<Duration> {
    match (health.state, health.opened_at) {
        (CircuitState::Open, Some(opened)) => Some(policy.cooldown.saturating_sub(opened.elapsed())),
        _ => None,
    }
}
