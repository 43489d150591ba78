//! Core value types shared by the acquisition engine.
//!
//! Target sources, layer kinds, per-attempt outcomes and the joined per-layer
//! state snapshot all live here so the breaker, the metrics registry and the
//! manager agree on one vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use super::errors::LayerError;

/// External system a query is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// Chemical database (synonyms, CAS, development codes)
    PubChem,
    /// Patent search engine with the strongest anti-bot defenses
    GooglePatents,
    /// WIPO Patentscope keyword search
    Wipo,
    /// Brazilian national patent office
    Inpi,
    /// Patent family register, used to turn a WO number into national filings
    PatentFamily,
}

impl TargetSource {
    pub const ALL: [TargetSource; 5] = [
        TargetSource::PubChem,
        TargetSource::GooglePatents,
        TargetSource::Wipo,
        TargetSource::Inpi,
        TargetSource::PatentFamily,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PubChem => "pubchem",
            Self::GooglePatents => "google_patents",
            Self::Wipo => "wipo",
            Self::Inpi => "inpi",
            Self::PatentFamily => "patent_family",
        }
    }
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition backend family
///
/// New variants need a code change; which backend serves a kind is decided
/// by whoever registers layers with the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Browser automation: highest stealth, slowest
    Browser,
    /// Plain HTTP client: fast, medium stealth
    Http,
    /// Robust fallback browser: high compatibility, last resort
    FallbackBrowser,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Browser, LayerKind::Http, LayerKind::FallbackBrowser];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Http => "http",
            Self::FallbackBrowser => "fallback_browser",
        }
    }

    /// Browser-style layers are resource heavy and get longer cooldowns
    #[must_use]
    pub const fn is_browser(&self) -> bool {
        matches!(self, Self::Browser | Self::FallbackBrowser)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses one layer or every layer for administrative resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSelector {
    One(LayerKind),
    All,
}

impl From<LayerKind> for LayerSelector {
    fn from(kind: LayerKind) -> Self {
        Self::One(kind)
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - requests proceed
    Closed,
    /// Cooldown elapsed - a single trial request is let through
    HalfOpen,
    /// Failing - layer is out of rotation until the cooldown elapses
    Open,
}

/// Result of one invocation of one layer
///
/// Built by the manager after each call, handed to the metrics registry and
/// the circuit breaker, then dropped.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub layer: LayerKind,
    pub target: TargetSource,
    pub success: bool,
    pub blocked: bool,
    pub latency: Duration,
    pub identifiers: Vec<String>,
    pub error: Option<LayerError>,
}

impl AttemptOutcome {
    #[must_use]
    pub fn succeeded(
        layer: LayerKind,
        target: TargetSource,
        latency: Duration,
        identifiers: Vec<String>,
    ) -> Self {
        Self {
            layer,
            target,
            success: true,
            blocked: false,
            latency,
            identifiers,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(layer: LayerKind, target: TargetSource, latency: Duration, error: LayerError) -> Self {
        Self {
            layer,
            target,
            success: false,
            blocked: error.is_block(),
            latency,
            identifiers: Vec::new(),
            error: Some(error),
        }
    }
}

/// How a single `search` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// A layer answered successfully
    Found,
    /// Every candidate layer was unavailable or failed; the result is empty
    AllLayersFailed,
    /// The caller cancelled before a layer answered
    Cancelled,
}

/// Joined view of one layer's circuit and session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerState {
    pub kind: LayerKind,
    pub consecutive_failures: u32,
    pub circuit_status: CircuitState,
    pub opened_at: Option<Instant>,
    /// Set while the circuit is Open
    pub cooldown_remaining: Option<Duration>,
    pub session_started_at: Option<Instant>,
    pub requests_in_session: u32,
}
