//! Core configuration types for the acquisition engine
//!
//! Static per-kind layer settings, per-source politeness delays and the retry
//! parameters. All durations serialize as (fractional) seconds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::duration_secs;
use crate::crawl_engine::crawl_types::{LayerKind, TargetSource};
use crate::utils::{
    BROWSER_CALL_TIMEOUT, BROWSER_CIRCUIT_COOLDOWN, BROWSER_MAX_SESSION, DEFAULT_BLOCK_PENALTY,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENT_QUERIES, DEFAULT_MAX_FAILURES,
    DEFAULT_MAX_RESULTS, DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY,
    FALLBACK_BROWSER_CALL_TIMEOUT, HTTP_CALL_TIMEOUT, HTTP_CIRCUIT_COOLDOWN, HTTP_MAX_REQUESTS_PER_SESSION,
    HTTP_MAX_SESSION,
};

/// Static configuration of one layer kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerProfile {
    /// Consecutive failures before the circuit opens
    pub max_failures: u32,

    /// How long an open circuit keeps the layer out of rotation
    #[serde(with = "duration_secs")]
    pub cooldown: Duration,

    /// Session age after which the layer is recycled
    #[serde(with = "duration_secs")]
    pub max_session_duration: Duration,

    /// Requests after which the layer is recycled (`None` = uncapped)
    #[serde(default)]
    pub max_requests_per_session: Option<u32>,

    /// Upper bound for a single `initialize` or `search` call
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,

    /// Failure weight of a detected block
    #[serde(default = "default_block_penalty")]
    pub block_penalty: u32,
}

fn default_block_penalty() -> u32 {
    DEFAULT_BLOCK_PENALTY
}

impl LayerProfile {
    /// Built-in profile for a kind
    #[must_use]
    pub fn for_kind(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Browser => Self {
                max_failures: DEFAULT_MAX_FAILURES,
                cooldown: BROWSER_CIRCUIT_COOLDOWN,
                max_session_duration: BROWSER_MAX_SESSION,
                max_requests_per_session: None,
                call_timeout: BROWSER_CALL_TIMEOUT,
                block_penalty: DEFAULT_BLOCK_PENALTY,
            },
            LayerKind::Http => Self {
                max_failures: DEFAULT_MAX_FAILURES,
                cooldown: HTTP_CIRCUIT_COOLDOWN,
                max_session_duration: HTTP_MAX_SESSION,
                max_requests_per_session: Some(HTTP_MAX_REQUESTS_PER_SESSION),
                call_timeout: HTTP_CALL_TIMEOUT,
                block_penalty: DEFAULT_BLOCK_PENALTY,
            },
            LayerKind::FallbackBrowser => Self {
                max_failures: DEFAULT_MAX_FAILURES,
                cooldown: BROWSER_CIRCUIT_COOLDOWN,
                max_session_duration: BROWSER_MAX_SESSION,
                max_requests_per_session: None,
                call_timeout: FALLBACK_BROWSER_CALL_TIMEOUT,
                block_penalty: DEFAULT_BLOCK_PENALTY,
            },
        }
    }
}

/// Politeness delay bounds for one target source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    #[serde(with = "duration_secs")]
    pub min: Duration,
    #[serde(with = "duration_secs")]
    pub max: Duration,
}

impl DelayRange {
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No pacing at all
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Built-in delay window for a source
    ///
    /// Google Patents gets a wide 15-30s window, lightly protected sources a
    /// narrow sub-second or few-second one.
    #[must_use]
    pub fn for_target(target: TargetSource) -> Self {
        let (min, max) = match target {
            TargetSource::GooglePatents => (15.0, 30.0),
            TargetSource::Wipo => (2.0, 4.0),
            TargetSource::Inpi => (0.5, 1.0),
            TargetSource::PubChem => (1.0, 2.0),
            TargetSource::PatentFamily => (2.0, 5.0),
        };
        Self::new(Duration::from_secs_f64(min), Duration::from_secs_f64(max))
    }
}

/// Backoff parameters for retries on the same layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per layer per query before moving to the next layer
    pub max_attempts: u32,
    /// Delay of the first retry before jitter
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
    /// Cap for any single backoff
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

/// Main configuration for `CrawlerManager`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Per-kind overrides; kinds missing here use `LayerProfile::for_kind`
    pub(crate) layer_profiles: BTreeMap<LayerKind, LayerProfile>,

    /// Per-source overrides; sources missing here use `DelayRange::for_target`
    pub(crate) politeness: BTreeMap<TargetSource, DelayRange>,

    pub(crate) retry: RetrySettings,

    /// Identifiers requested from a layer when the caller gives no limit
    pub(crate) default_max_results: usize,

    /// Queries of one `search_multi` batch in flight at once
    pub(crate) max_concurrent_queries: usize,

    /// Treat an empty successful answer as a reason to try the next layer
    pub(crate) fall_through_on_empty: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            layer_profiles: LayerKind::ALL
                .iter()
                .map(|kind| (*kind, LayerProfile::for_kind(*kind)))
                .collect(),
            politeness: TargetSource::ALL
                .iter()
                .map(|target| (*target, DelayRange::for_target(*target)))
                .collect(),
            retry: RetrySettings::default(),
            default_max_results: DEFAULT_MAX_RESULTS,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            fall_through_on_empty: false,
        }
    }
}
