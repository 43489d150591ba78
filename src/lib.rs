pub mod config;
pub mod crawl_engine;
pub mod http_layer;
pub mod orchestrator;
pub mod results;
pub mod utils;

pub use config::{DelayRange, LayerProfile, ManagerConfig, ManagerConfigBuilder, RetrySettings};
pub use crawl_engine::{
    AttemptOutcome, CancelToken, CircuitBreaker, CircuitSnapshot, CircuitState, CleanupResult,
    CrawlerManager, Layer, LayerError, LayerKind, LayerResult, LayerSelector, LayerState,
    LayerStrategyTable, ManagerError, ManagerResult, MetricsSnapshot, MultiSearchOutcome,
    SearchOutcome, SearchStatus, TargetSource,
};
pub use http_layer::{HttpEndpoints, HttpLayer};
pub use orchestrator::{
    OrchestratorSettings, PatentOrigin, PatentRecord, PatentSearchReport, PatentSearchRequest,
    SearchOrchestrator,
};
pub use results::{CanonicalIdentifier, Provenance, ResultDeduplicator, ResultEntry, SearchResult};
