//! Error types for the acquisition engine
//!
//! `LayerError` is what a backend reports for one call; the manager absorbs
//! it (record, retry, fall back) and never lets it escape `search`.
//! `ManagerError` covers configuration and programmer mistakes, which fail
//! fast and are not retried.

use std::time::Duration;
use thiserror::Error;

use super::crawl_types::{LayerKind, TargetSource};

/// Convenience alias for layer operations
pub type LayerResult<T> = Result<T, LayerError>;

/// Failure reported by an acquisition layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayerError {
    /// Environment or setup failure; the layer is skipped for the current call
    #[error("layer initialization failed: {0}")]
    Init(String),

    /// The source detected automation (captcha, "unusual traffic", 403)
    #[error("blocked by source: {0}")]
    Blocked(String),

    /// The call did not finish within its time budget
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The source asked us to slow down
    #[error("rate limited by source")]
    RateLimited { retry_after: Option<Duration> },

    /// Unexpected status, malformed payload, connection error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Releasing held resources failed
    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

impl LayerError {
    /// Blocks carry a heavier circuit penalty than other failures
    #[must_use]
    pub const fn is_block(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    /// Whether the same layer may be tried again within the current call
    ///
    /// Init failures are fatal to the layer for this call.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Init(_) | Self::Cleanup(_))
    }

    /// Base backoff multiplier for this failure class
    #[must_use]
    pub const fn delay_multiplier(&self) -> f64 {
        match self {
            Self::Blocked(_) => 2.0,
            Self::RateLimited { .. } => 3.0,
            Self::Init(_) | Self::Timeout(_) | Self::Protocol(_) | Self::Cleanup(_) => 1.0,
        }
    }
}

/// Configuration or programmer error surfaced by the manager
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagerError {
    /// The layer kind is not registered with this manager
    #[error("layer '{0}' is not registered")]
    InvalidLayer(LayerKind),

    /// No strategy is configured for the target source
    #[error("no layer strategy configured for target '{0}'")]
    InvalidTarget(TargetSource),

    /// Blank or oversized query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Inconsistent configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;
