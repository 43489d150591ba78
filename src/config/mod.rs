//! Configuration module for the acquisition engine
//!
//! This module provides `ManagerConfig`, its builder, and the per-kind and
//! per-source value types it is made of.

// Sub-modules
pub mod builder;
pub(crate) mod duration_secs;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::ManagerConfigBuilder;
pub use types::{DelayRange, LayerProfile, ManagerConfig, RetrySettings};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl_engine::crawl_types::{LayerKind, TargetSource};
    use std::time::Duration;

    #[test]
    fn test_default_profiles_differ_by_kind() {
        let config = ManagerConfig::default();
        let http = config.profile(LayerKind::Http);
        let browser = config.profile(LayerKind::Browser);

        assert!(http.cooldown < browser.cooldown);
        assert_eq!(http.max_requests_per_session, Some(50));
        assert_eq!(browser.max_requests_per_session, None);
    }

    #[test]
    fn test_builder_rejects_inverted_delay_range() {
        let result = ManagerConfig::builder()
            .politeness(
                TargetSource::Wipo,
                DelayRange::new(Duration::from_secs(5), Duration::from_secs(1)),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_attempts() {
        assert!(ManagerConfig::builder().max_attempts(0).build().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ManagerConfig::from_json_str(
            r#"{
                "layer_profiles": {
                    "http": {
                        "max_failures": 5,
                        "cooldown": 30,
                        "max_session_duration": 60,
                        "call_timeout": 10.5
                    }
                },
                "max_concurrent_queries": 1
            }"#,
        )
        .expect("partial config should parse");

        let http = config.profile(LayerKind::Http);
        assert_eq!(http.max_failures, 5);
        assert_eq!(http.cooldown, Duration::from_secs(30));
        assert_eq!(http.call_timeout, Duration::from_millis(10_500));
        assert_eq!(http.max_requests_per_session, None);
        assert_eq!(http.block_penalty, 2);
        assert_eq!(config.max_concurrent_queries(), 1);

        // Kinds missing from the file fall back to built-in profiles
        assert_eq!(
            config.profile(LayerKind::Browser),
            LayerProfile::for_kind(LayerKind::Browser)
        );
        assert_eq!(
            config.politeness(TargetSource::GooglePatents),
            DelayRange::for_target(TargetSource::GooglePatents)
        );
    }
}
