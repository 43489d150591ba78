//! Per-layer, per-source and global acquisition metrics
//!
//! Global counters are lock-free atomics; per-key records live in `DashMap`
//! entries updated in short critical sections. `snapshot()` returns a plain
//! serializable copy.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::circuit_breaker::CircuitSnapshot;
use super::crawl_types::{AttemptOutcome, LayerKind, LayerSelector, TargetSource};
use super::errors::LayerError;

/// Running counters for one layer kind
#[derive(Debug, Clone, Default)]
struct LayerMetrics {
    total_requests: u64,
    successful: u64,
    failed: u64,
    blocked: u64,
    timeouts: u64,
    rate_limited: u64,
    /// Identifiers returned, counted before deduplication
    identifiers_found: u64,
    /// Sum of successful attempt latencies
    success_latency: Duration,
}

#[derive(Debug, Clone, Default)]
struct TargetMetrics {
    searches: u64,
    found: u64,
    all_layers_failed: u64,
}

/// Thread-safe metrics registry shared by the manager
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    layers: DashMap<LayerKind, LayerMetrics>,
    targets: DashMap<TargetSource, TargetMetrics>,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
}

impl MetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one layer attempt
    pub fn record(&self, outcome: &AttemptOutcome) {
        let mut entry = self.layers.entry(outcome.layer).or_default();
        let metrics = entry.value_mut();

        metrics.total_requests += 1;
        if outcome.success {
            metrics.successful += 1;
            metrics.identifiers_found += outcome.identifiers.len() as u64;
            metrics.success_latency += outcome.latency;
        } else {
            metrics.failed += 1;
            if outcome.blocked {
                metrics.blocked += 1;
            }
            match outcome.error {
                Some(LayerError::Timeout(_)) => metrics.timeouts += 1,
                Some(LayerError::RateLimited { .. }) => metrics.rate_limited += 1,
                _ => {}
            }
        }
    }

    /// Record the end of one `search` call
    ///
    /// `layer_used` is `None` when every candidate failed.
    pub fn record_search(&self, target: TargetSource, layer_used: Option<LayerKind>) {
        self.total_requests.fetch_add(1, Ordering::SeqCst);

        let mut entry = self.targets.entry(target).or_default();
        let metrics = entry.value_mut();
        metrics.searches += 1;

        if layer_used.is_some() {
            metrics.found += 1;
            self.successful_requests.fetch_add(1, Ordering::SeqCst);
        } else {
            metrics.all_layers_failed += 1;
            self.failed_requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let layers: BTreeMap<LayerKind, LayerMetricsSnapshot> = self
            .layers
            .iter()
            .map(|entry| (*entry.key(), LayerMetricsSnapshot::from(entry.value())))
            .collect();

        let targets = self
            .targets
            .iter()
            .map(|entry| {
                let m = entry.value();
                (
                    *entry.key(),
                    TargetMetricsSnapshot {
                        searches: m.searches,
                        found: m.found,
                        all_layers_failed: m.all_layers_failed,
                    },
                )
            })
            .collect();

        let layer_usage = layers
            .iter()
            .map(|(kind, m)| (*kind, m.total_requests))
            .collect();

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::SeqCst),
            successful_requests: self.successful_requests.load(Ordering::SeqCst),
            failed_requests: self.failed_requests.load(Ordering::SeqCst),
            layer_usage,
            layers,
            targets,
            circuits: BTreeMap::new(),
            open_layers: Vec::new(),
        }
    }

    /// Forget the metrics of one layer, or of everything
    pub fn reset(&self, selector: LayerSelector) {
        match selector {
            LayerSelector::One(kind) => {
                self.layers.remove(&kind);
            }
            LayerSelector::All => {
                self.layers.clear();
                self.targets.clear();
                self.total_requests.store(0, Ordering::SeqCst);
                self.successful_requests.store(0, Ordering::SeqCst);
                self.failed_requests.store(0, Ordering::SeqCst);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerMetricsSnapshot {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub blocked: u64,
    pub timeouts: u64,
    pub rate_limited: u64,
    pub identifiers_found: u64,
    /// Mean latency of successful attempts, in milliseconds
    pub avg_latency_ms: f64,
}

impl From<&LayerMetrics> for LayerMetricsSnapshot {
    fn from(m: &LayerMetrics) -> Self {
        let avg_latency_ms = if m.successful == 0 {
            0.0
        } else {
            m.success_latency.as_secs_f64() * 1000.0 / m.successful as f64
        };
        Self {
            total_requests: m.total_requests,
            successful: m.successful,
            failed: m.failed,
            blocked: m.blocked,
            timeouts: m.timeouts,
            rate_limited: m.rate_limited,
            identifiers_found: m.identifiers_found,
            avg_latency_ms,
        }
    }
}

impl LayerMetricsSnapshot {
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total_requests as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetMetricsSnapshot {
    pub searches: u64,
    pub found: u64,
    pub all_layers_failed: u64,
}

/// Read-only copy of the registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Attempts per layer
    pub layer_usage: BTreeMap<LayerKind, u64>,
    pub layers: BTreeMap<LayerKind, LayerMetricsSnapshot>,
    pub targets: BTreeMap<TargetSource, TargetMetricsSnapshot>,
    /// Circuit view per layer, filled in by the manager
    pub circuits: BTreeMap<LayerKind, CircuitSnapshot>,
    /// Layers currently out of rotation
    pub open_layers: Vec<LayerKind>,
}

impl MetricsSnapshot {
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(layer: LayerKind, ms: u64, ids: usize) -> AttemptOutcome {
        AttemptOutcome::succeeded(
            layer,
            TargetSource::Wipo,
            Duration::from_millis(ms),
            (0..ids).map(|i| format!("WO20200000{i:02}")).collect(),
        )
    }

    #[test]
    fn test_layer_counters_and_latency() {
        let registry = MetricsRegistry::new();
        registry.record(&ok(LayerKind::Http, 100, 3));
        registry.record(&ok(LayerKind::Http, 300, 1));
        registry.record(&AttemptOutcome::failed(
            LayerKind::Http,
            TargetSource::Wipo,
            Duration::from_secs(30),
            LayerError::Timeout(Duration::from_secs(30)),
        ));
        registry.record(&AttemptOutcome::failed(
            LayerKind::Http,
            TargetSource::Wipo,
            Duration::from_millis(50),
            LayerError::Blocked("captcha".into()),
        ));

        let snapshot = registry.snapshot();
        let http = &snapshot.layers[&LayerKind::Http];
        assert_eq!(http.total_requests, 4);
        assert_eq!(http.successful, 2);
        assert_eq!(http.failed, 2);
        assert_eq!(http.blocked, 1);
        assert_eq!(http.timeouts, 1);
        assert_eq!(http.identifiers_found, 4);
        assert!((http.avg_latency_ms - 200.0).abs() < 1e-6);
        assert!((http.success_rate() - 0.5).abs() < 1e-9);
        assert_eq!(snapshot.layer_usage[&LayerKind::Http], 4);
    }

    #[test]
    fn test_search_counters_and_reset() {
        let registry = MetricsRegistry::new();
        registry.record(&ok(LayerKind::Browser, 10, 1));
        registry.record_search(TargetSource::GooglePatents, Some(LayerKind::Browser));
        registry.record_search(TargetSource::GooglePatents, None);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert!((snapshot.success_rate() - 0.5).abs() < 1e-9);
        assert_eq!(
            snapshot.targets[&TargetSource::GooglePatents],
            TargetMetricsSnapshot {
                searches: 2,
                found: 1,
                all_layers_failed: 1
            }
        );

        registry.reset(LayerSelector::One(LayerKind::Browser));
        let snapshot = registry.snapshot();
        assert!(snapshot.layers.is_empty());
        assert_eq!(snapshot.total_requests, 2);

        registry.reset(LayerSelector::All);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert!(snapshot.targets.is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = MetricsRegistry::new();
        registry.record(&ok(LayerKind::FallbackBrowser, 10, 1));
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["layers"]["fallback_browser"]["successful"], 1);
    }
}
