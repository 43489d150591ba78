//! Capability contract implemented by every acquisition backend
//!
//! The manager holds layers as `Box<dyn Layer>` and never looks at the
//! concrete type. Methods return boxed futures so the trait stays
//! dyn-compatible.

use futures::future::BoxFuture;

use super::crawl_types::{LayerKind, TargetSource};
use super::errors::LayerResult;
use crate::config::LayerProfile;

/// One acquisition backend (browser automation, plain HTTP, fallback browser)
///
/// A layer instance is only ever driven by one task at a time: the pool slot
/// that owns it takes `&mut self` for every call.
pub trait Layer: Send {
    /// Kind this backend is registered under
    fn kind(&self) -> LayerKind;

    /// Acquire the resources the layer needs (browser process, HTTP client)
    ///
    /// Failures must be reported as `LayerError::Init`.
    fn initialize<'a>(&'a mut self, profile: &'a LayerProfile) -> BoxFuture<'a, LayerResult<()>>;

    /// Run one query against `target` and return raw identifiers
    ///
    /// The result is unordered from the manager's point of view, may contain
    /// duplicates and may be longer than `max_results`.
    fn search<'a>(
        &'a mut self,
        target: TargetSource,
        query: &'a str,
        max_results: usize,
    ) -> BoxFuture<'a, LayerResult<Vec<String>>>;

    /// Release everything `initialize` acquired
    ///
    /// Must be idempotent and safe to call after a failed `initialize`.
    fn cleanup<'a>(&'a mut self) -> BoxFuture<'a, LayerResult<()>>;
}
