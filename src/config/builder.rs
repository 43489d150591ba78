//! Fluent builder for `ManagerConfig`
//!
//! Every field has a default, so the builder only carries overrides and
//! validates the combined result in `build()`.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use super::types::{DelayRange, LayerProfile, ManagerConfig, RetrySettings};
use crate::crawl_engine::crawl_types::{LayerKind, TargetSource};
use crate::crawl_engine::errors::{ManagerError, ManagerResult};

#[derive(Debug, Clone, Default)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfig {
    /// Create a builder seeded with the built-in defaults
    #[must_use]
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Continue building from this configuration
    #[must_use]
    pub fn into_builder(self) -> ManagerConfigBuilder {
        ManagerConfigBuilder { config: self }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields keep their defaults. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: ManagerConfig =
            serde_json::from_str(raw).context("Failed to parse manager config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> ManagerResult<()> {
        for (kind, profile) in &self.layer_profiles {
            if profile.max_failures == 0 {
                return Err(ManagerError::Config(format!(
                    "max_failures for layer '{kind}' must be at least 1"
                )));
            }
            if profile.block_penalty == 0 {
                return Err(ManagerError::Config(format!(
                    "block_penalty for layer '{kind}' must be at least 1"
                )));
            }
            if profile.call_timeout.is_zero() {
                return Err(ManagerError::Config(format!(
                    "call_timeout for layer '{kind}' must be positive"
                )));
            }
            if profile.max_requests_per_session == Some(0) {
                return Err(ManagerError::Config(format!(
                    "max_requests_per_session for layer '{kind}' must be at least 1 when set"
                )));
            }
        }

        for (target, range) in &self.politeness {
            if range.min > range.max {
                return Err(ManagerError::Config(format!(
                    "politeness delay for '{target}' has min {:?} above max {:?}",
                    range.min, range.max
                )));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(ManagerError::Config("retry max_attempts must be at least 1".into()));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ManagerError::Config(
                "retry base_delay must not exceed max_delay".into(),
            ));
        }
        if self.max_concurrent_queries == 0 {
            return Err(ManagerError::Config(
                "max_concurrent_queries must be at least 1".into(),
            ));
        }
        if self.default_max_results == 0 {
            return Err(ManagerError::Config(
                "default_max_results must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

impl ManagerConfigBuilder {
    /// Override the static profile of one layer kind
    #[must_use]
    pub fn layer_profile(mut self, kind: LayerKind, profile: LayerProfile) -> Self {
        self.config.layer_profiles.insert(kind, profile);
        self
    }

    /// Override only the circuit cooldown of one layer kind
    #[must_use]
    pub fn cooldown(mut self, kind: LayerKind, cooldown: Duration) -> Self {
        let mut profile = self.config.profile(kind);
        profile.cooldown = cooldown;
        self.config.layer_profiles.insert(kind, profile);
        self
    }

    /// Override the politeness window of one target source
    #[must_use]
    pub fn politeness(mut self, target: TargetSource, range: DelayRange) -> Self {
        self.config.politeness.insert(target, range);
        self
    }

    /// Disable pacing for every source
    #[must_use]
    pub fn without_politeness(mut self) -> Self {
        for target in TargetSource::ALL {
            self.config.politeness.insert(target, DelayRange::zero());
        }
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn default_max_results(mut self, max_results: usize) -> Self {
        self.config.default_max_results = max_results;
        self
    }

    #[must_use]
    pub fn max_concurrent_queries(mut self, limit: usize) -> Self {
        self.config.max_concurrent_queries = limit;
        self
    }

    #[must_use]
    pub fn fall_through_on_empty(mut self, enabled: bool) -> Self {
        self.config.fall_through_on_empty = enabled;
        self
    }

    pub fn build(self) -> ManagerResult<ManagerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
