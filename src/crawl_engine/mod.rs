//! Crawl Engine Module
//!
//! This module contains the acquisition engine: the layer contract, the
//! per-layer circuit breaker, session and retry policies, politeness pacing,
//! metrics, and the `CrawlerManager` that ties them together.

// Sub-modules
pub mod cancel;
pub mod circuit_breaker;
pub mod cleanup;
pub mod crawl_types;
pub mod errors;
pub mod layer;
pub mod layer_pool;
pub mod manager;
pub mod metrics;
pub mod pacing;
pub mod retry_policy;
pub mod session_guard;
pub mod strategy;

// Re-exports for public API
pub use cancel::CancelToken;
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, LayerHealth};
pub use cleanup::CleanupResult;
pub use crawl_types::{
    AttemptOutcome, CircuitState, LayerKind, LayerSelector, LayerState, SearchStatus, TargetSource,
};
pub use errors::{LayerError, LayerResult, ManagerError, ManagerResult};
pub use layer::Layer;
pub use manager::{CrawlerManager, MultiSearchOutcome, SearchOutcome};
pub use metrics::{LayerMetricsSnapshot, MetricsRegistry, MetricsSnapshot, TargetMetricsSnapshot};
pub use retry_policy::RetryPolicy;
pub use session_guard::SessionGuard;
pub use strategy::LayerStrategyTable;
