//! Read accessors for `ManagerConfig`

use super::types::{DelayRange, LayerProfile, ManagerConfig, RetrySettings};
use crate::crawl_engine::crawl_types::{LayerKind, TargetSource};

impl ManagerConfig {
    /// Profile of a layer kind, falling back to the built-in one
    #[must_use]
    pub fn profile(&self, kind: LayerKind) -> LayerProfile {
        self.layer_profiles
            .get(&kind)
            .copied()
            .unwrap_or_else(|| LayerProfile::for_kind(kind))
    }

    /// Politeness window of a source, falling back to the built-in one
    #[must_use]
    pub fn politeness(&self, target: TargetSource) -> DelayRange {
        self.politeness
            .get(&target)
            .copied()
            .unwrap_or_else(|| DelayRange::for_target(target))
    }

    #[must_use]
    pub fn retry(&self) -> RetrySettings {
        self.retry
    }

    #[must_use]
    pub fn default_max_results(&self) -> usize {
        self.default_max_results
    }

    #[must_use]
    pub fn max_concurrent_queries(&self) -> usize {
        self.max_concurrent_queries
    }

    #[must_use]
    pub fn fall_through_on_empty(&self) -> bool {
        self.fall_through_on_empty
    }
}
