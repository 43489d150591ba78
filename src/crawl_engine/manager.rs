//! Multi-layer acquisition manager
//!
//! `CrawlerManager` picks candidate layers per target source, skips layers
//! whose circuit is open, paces requests per source, retries with backoff,
//! falls back to the next layer and merges identifiers. Attempt-level
//! failures are absorbed here; callers only see `ManagerError` for
//! configuration or usage mistakes.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::circuit_breaker::CircuitBreaker;
use super::cleanup::CleanupResult;
use super::crawl_types::{
    AttemptOutcome, CircuitState, LayerKind, LayerSelector, LayerState, SearchStatus, TargetSource,
};
use super::errors::{ManagerError, ManagerResult};
use super::layer::Layer;
use super::layer_pool::{LayerPool, PoolCleanupGuard};
use super::metrics::{MetricsRegistry, MetricsSnapshot};
use super::pacing::PolitenessPacer;
use super::retry_policy::RetryPolicy;
use super::strategy::LayerStrategyTable;
use crate::config::ManagerConfig;
use crate::results::{Provenance, ResultDeduplicator, SearchResult};
use crate::utils::MAX_QUERY_LENGTH;

/// Result of one `search` call
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub result: SearchResult,
    /// Layer that produced the result
    pub layer_used: Option<LayerKind>,
    pub status: SearchStatus,
    /// Layer invocations made, across all candidates
    pub attempts: u32,
}

impl SearchOutcome {
    fn without_result(status: SearchStatus, attempts: u32) -> Self {
        Self {
            result: SearchResult::default(),
            layer_used: None,
            status,
            attempts,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.status == SearchStatus::Found
    }
}

/// Result of one `search_multi` batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct MultiSearchOutcome {
    pub result: SearchResult,
    /// Successful searches per layer
    pub layer_usage: BTreeMap<LayerKind, usize>,
    /// Queries that ran to completion
    pub searched: usize,
    /// Queries where every layer failed or that were rejected
    pub failed_queries: Vec<String>,
    pub cancelled: bool,
}

pub struct CrawlerManager {
    config: ManagerConfig,
    strategy: LayerStrategyTable,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    pacer: PolitenessPacer,
    metrics: MetricsRegistry,
    pool: Arc<LayerPool>,
}

impl CrawlerManager {
    /// Build a manager over `layers`
    ///
    /// Each kind may be registered once, and every kind named by `strategy`
    /// must be registered.
    pub fn new(
        config: ManagerConfig,
        strategy: LayerStrategyTable,
        layers: Vec<Box<dyn Layer>>,
    ) -> ManagerResult<Self> {
        config.validate()?;
        let pool = LayerPool::new(layers, &config)?;

        if let Some(missing) = strategy
            .referenced_kinds()
            .into_iter()
            .find(|kind| !pool.contains(*kind))
        {
            return Err(ManagerError::InvalidLayer(missing));
        }

        let breaker = CircuitBreaker::from_config(&config, pool.kinds());
        let retry = RetryPolicy::from(config.retry());
        let pacer = PolitenessPacer::from_config(&config);

        info!(layers = ?pool.kinds(), "Crawler manager ready");

        Ok(Self {
            config,
            strategy,
            breaker,
            retry,
            pacer,
            metrics: MetricsRegistry::new(),
            pool: Arc::new(pool),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    #[must_use]
    pub fn strategy(&self) -> &LayerStrategyTable {
        &self.strategy
    }

    #[must_use]
    pub fn layer_kinds(&self) -> Vec<LayerKind> {
        self.pool.kinds()
    }

    /// Search `target` for `query` with the default result limit
    pub async fn search(&self, query: &str, target: TargetSource) -> ManagerResult<SearchOutcome> {
        self.search_with_cancel(query, target, self.config.default_max_results(), &CancelToken::new())
            .await
    }

    pub async fn search_with_limit(
        &self,
        query: &str,
        target: TargetSource,
        max_results: usize,
    ) -> ManagerResult<SearchOutcome> {
        self.search_with_cancel(query, target, max_results, &CancelToken::new())
            .await
    }

    /// Search with fallback across the target's candidate layers
    ///
    /// Every candidate failing is not an error: the outcome is empty with
    /// status `AllLayersFailed`.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        target: TargetSource,
        max_results: usize,
        cancel: &CancelToken,
    ) -> ManagerResult<SearchOutcome> {
        let query = validate_query(query)?;
        let candidates = self.strategy.candidates(target)?;
        let mut attempts = 0u32;
        // Layer that answered successfully with nothing, when falling through on empty
        let mut empty_answer: Option<LayerKind> = None;

        for &kind in candidates {
            if cancel.is_cancelled() {
                return Ok(SearchOutcome::without_result(SearchStatus::Cancelled, attempts));
            }
            if !self.breaker.is_available(kind)? {
                debug!(%target, layer = %kind, "Layer unavailable (circuit open), skipping");
                continue;
            }

            let mut attempt = 0u32;
            loop {
                if !self.pacer.wait(target, cancel).await {
                    return Ok(SearchOutcome::without_result(SearchStatus::Cancelled, attempts));
                }

                let mut slot = tokio::select! {
                    slot = self.pool.acquire(kind) => slot?,
                    () = cancel.cancelled() => {
                        return Ok(SearchOutcome::without_result(SearchStatus::Cancelled, attempts));
                    }
                };

                // Re-check under the slot: the circuit may have opened while we queued
                if !self.breaker.is_available(kind)? {
                    debug!(%target, layer = %kind, "Circuit opened while waiting for layer, falling through");
                    break;
                }

                attempts += 1;
                let started = Instant::now();
                let result = slot.execute(target, query, max_results).await;
                drop(slot);
                let latency = started.elapsed();

                match result {
                    Ok(identifiers) => {
                        let outcome = AttemptOutcome::succeeded(kind, target, latency, identifiers);
                        self.metrics.record(&outcome);
                        self.breaker.record_outcome(&outcome)?;

                        if outcome.identifiers.is_empty() && self.config.fall_through_on_empty() {
                            info!(%target, layer = %kind, query, "Layer answered with no identifiers, trying next layer");
                            empty_answer = Some(kind);
                            break;
                        }

                        info!(
                            %target,
                            layer = %kind,
                            count = outcome.identifiers.len(),
                            ?latency,
                            "Search succeeded"
                        );
                        self.metrics.record_search(target, Some(kind));

                        let provenance = Provenance::new(kind, target, query);
                        let mut dedup = ResultDeduplicator::new();
                        dedup.push_batch(&provenance, &outcome.identifiers);
                        let mut result = dedup.finish();
                        result.truncate(max_results);

                        return Ok(SearchOutcome {
                            result,
                            layer_used: Some(kind),
                            status: SearchStatus::Found,
                            attempts,
                        });
                    }
                    Err(error) => {
                        // Init failures skip the layer for this call
                        let fatal = !error.is_retryable();
                        let outcome = AttemptOutcome::failed(kind, target, latency, error.clone());
                        self.metrics.record(&outcome);
                        let state = self.breaker.record_outcome(&outcome)?;

                        warn!(
                            %target,
                            layer = %kind,
                            attempt = attempt + 1,
                            blocked = outcome.blocked,
                            "Layer attempt failed: {error}"
                        );

                        if fatal || state == CircuitState::Open || !self.retry.should_retry(attempt) {
                            break;
                        }

                        let delay = self.retry.delay_for(attempt, &error);
                        debug!(%target, layer = %kind, ?delay, "Backing off before retry");
                        attempt += 1;
                        if !cancel.sleep(delay).await {
                            return Ok(SearchOutcome::without_result(SearchStatus::Cancelled, attempts));
                        }
                    }
                }
            }
        }

        if let Some(kind) = empty_answer {
            self.metrics.record_search(target, Some(kind));
            return Ok(SearchOutcome {
                result: SearchResult::default(),
                layer_used: Some(kind),
                status: SearchStatus::Found,
                attempts,
            });
        }

        warn!(%target, query, attempts, "All layers failed");
        self.metrics.record_search(target, None);
        Ok(SearchOutcome::without_result(SearchStatus::AllLayersFailed, attempts))
    }

    /// Run several queries against one target and merge their results
    pub async fn search_multi<S: AsRef<str>>(
        &self,
        queries: &[S],
        target: TargetSource,
        max_results_per_query: usize,
    ) -> ManagerResult<MultiSearchOutcome> {
        self.search_multi_with_cancel(queries, target, max_results_per_query, &CancelToken::new())
            .await
    }

    /// Run queries with at most `max_concurrent_queries` in flight
    ///
    /// Batches are merged in completion order. On cancellation no new query
    /// is started, in-flight ones are abandoned, every layer is cleaned up and
    /// the partial result is returned with `cancelled` set.
    pub async fn search_multi_with_cancel<S: AsRef<str>>(
        &self,
        queries: &[S],
        target: TargetSource,
        max_results_per_query: usize,
        cancel: &CancelToken,
    ) -> ManagerResult<MultiSearchOutcome> {
        self.strategy.candidates(target)?;

        let runnable: Vec<&str> = queries
            .iter()
            .map(AsRef::as_ref)
            .filter(|q| {
                let blank = q.trim().is_empty();
                if blank {
                    warn!(%target, "Skipping blank query");
                }
                !blank
            })
            .collect();

        let mut outcome = MultiSearchOutcome::default();
        if runnable.is_empty() {
            return Ok(outcome);
        }

        info!(%target, queries = runnable.len(), "Starting multi-query search");
        let mut guard = PoolCleanupGuard::new(Arc::clone(&self.pool));
        let mut dedup = ResultDeduplicator::new();

        {
            let mut in_flight = stream::iter(runnable.into_iter().map(|query| async move {
                let result = self
                    .search_with_cancel(query, target, max_results_per_query, cancel)
                    .await;
                (query, result)
            }))
            .buffer_unordered(self.config.max_concurrent_queries());

            while let Some((query, result)) = in_flight.next().await {
                match result {
                    Ok(single) => match single.status {
                        SearchStatus::Found => {
                            outcome.searched += 1;
                            if let Some(kind) = single.layer_used {
                                *outcome.layer_usage.entry(kind).or_default() += 1;
                            }
                            dedup.push_result(single.result);
                        }
                        SearchStatus::AllLayersFailed => {
                            outcome.searched += 1;
                            outcome.failed_queries.push(query.to_string());
                        }
                        SearchStatus::Cancelled => {}
                    },
                    Err(e) => {
                        warn!(%target, query, "Query rejected: {e}");
                        outcome.failed_queries.push(query.to_string());
                    }
                }

                if cancel.is_cancelled() {
                    break;
                }
            }
        }

        outcome.result = dedup.finish();
        outcome.cancelled = cancel.is_cancelled();

        if outcome.cancelled {
            warn!(%target, searched = outcome.searched, "Multi-query search cancelled, releasing layers");
            self.pool.cleanup_all().await;
        }
        guard.disarm();

        info!(
            %target,
            searched = outcome.searched,
            unique = outcome.result.len(),
            failed = outcome.failed_queries.len(),
            "Multi-query search finished"
        );
        Ok(outcome)
    }

    /// Release every live layer
    pub async fn cleanup_all(&self) -> CleanupResult {
        self.pool.cleanup_all().await
    }

    /// Registry counters plus the current circuit view of every layer
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = self.metrics.snapshot();
        snapshot.circuits = self.breaker.snapshot();
        snapshot.open_layers = self.breaker.open_layers();
        snapshot
    }

    /// Close circuits and clear metrics for one layer or all layers
    pub fn reset_circuits(&self, selector: impl Into<LayerSelector>) -> ManagerResult<()> {
        let selector = selector.into();
        self.breaker.reset(selector)?;
        self.metrics.reset(selector);
        Ok(())
    }

    /// Joined circuit and session view of one layer
    ///
    /// Waits for any in-flight call on that layer to finish.
    pub async fn layer_state(&self, kind: LayerKind) -> ManagerResult<LayerState> {
        let health = self.breaker.status(kind)?;
        let cooldown_remaining = self.breaker.cooldown_remaining(kind)?;
        let slot = self.pool.acquire(kind).await?;

        Ok(LayerState {
            kind,
            consecutive_failures: health.consecutive_failures,
            circuit_status: health.state,
            opened_at: health.opened_at,
            cooldown_remaining,
            session_started_at: slot.session().started_at(),
            requests_in_session: slot.session().requests(),
        })
    }
}

fn validate_query(query: &str) -> ManagerResult<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ManagerError::InvalidQuery("query is blank".into()));
    }
    let len = trimmed.chars().count();
    if len > MAX_QUERY_LENGTH {
        return Err(ManagerError::InvalidQuery(format!(
            "query is {len} characters long, the limit is {MAX_QUERY_LENGTH}"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  semaglutide ").unwrap(), "semaglutide");
        assert!(matches!(validate_query("   "), Err(ManagerError::InvalidQuery(_))));
        assert!(validate_query(&"x".repeat(MAX_QUERY_LENGTH)).is_ok());
        assert!(validate_query(&"x".repeat(MAX_QUERY_LENGTH + 1)).is_err());
    }
}
