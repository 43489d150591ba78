//! Ownership and serialization of live layer instances
//!
//! One slot per registered `LayerKind`. A slot owns the layer, its
//! `SessionGuard` and its static profile behind an async mutex: callers queue
//! on the mutex, so a layer never serves two requests at once.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::cleanup::CleanupResult;
use super::crawl_types::{LayerKind, TargetSource};
use super::errors::{LayerError, LayerResult, ManagerError, ManagerResult};
use super::layer::Layer;
use super::session_guard::SessionGuard;
use crate::config::{LayerProfile, ManagerConfig};

/// A layer together with its session bookkeeping
pub struct LayerSlot {
    kind: LayerKind,
    layer: Box<dyn Layer>,
    session: SessionGuard,
    profile: LayerProfile,
    live: bool,
}

impl LayerSlot {
    fn new(layer: Box<dyn Layer>, profile: LayerProfile) -> Self {
        Self {
            kind: layer.kind(),
            layer,
            session: SessionGuard::new(),
            profile,
            live: false,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    /// Run one search, starting or recycling the session first when needed
    ///
    /// Initialization failures come back as `LayerError::Init`. The call is
    /// bounded by the profile's call timeout.
    pub async fn execute(
        &mut self,
        target: TargetSource,
        query: &str,
        max_results: usize,
    ) -> LayerResult<Vec<String>> {
        if self.live && self.session.should_recycle(&self.profile) {
            info!(
                layer = %self.kind,
                requests = self.session.requests(),
                "Recycling layer session"
            );
            if let Err(e) = self.release().await {
                warn!(layer = %self.kind, "Cleanup during recycle failed: {e}");
            }
        }

        if !self.live {
            self.start().await?;
        }

        self.session.record_request();
        let call_timeout = self.profile.call_timeout;
        match timeout(call_timeout, self.layer.search(target, query, max_results)).await {
            Ok(result) => result,
            Err(_) => Err(LayerError::Timeout(call_timeout)),
        }
    }

    async fn start(&mut self) -> LayerResult<()> {
        debug!(layer = %self.kind, "Initializing layer");
        let call_timeout = self.profile.call_timeout;
        let init = timeout(call_timeout, self.layer.initialize(&self.profile)).await;

        let error = match init {
            Ok(Ok(())) => {
                self.live = true;
                self.session.start();
                info!(layer = %self.kind, "Layer session started");
                return Ok(());
            }
            Ok(Err(LayerError::Init(msg))) => LayerError::Init(msg),
            Ok(Err(other)) => LayerError::Init(other.to_string()),
            Err(_) => LayerError::Init(format!("initialization timed out after {call_timeout:?}")),
        };

        warn!(layer = %self.kind, "Layer initialization failed: {error}");
        // Partially acquired resources still need releasing
        if let Err(e) = self.cleanup_with_timeout().await {
            warn!(layer = %self.kind, "Cleanup after failed initialization failed: {e}");
        }
        self.live = false;
        self.session.reset();
        Err(error)
    }

    /// Release the layer's resources and forget its session
    ///
    /// The slot is marked not live even if cleanup reports an error.
    pub async fn release(&mut self) -> LayerResult<()> {
        let result = self.cleanup_with_timeout().await;
        self.live = false;
        self.session.reset();
        result
    }

    async fn cleanup_with_timeout(&mut self) -> LayerResult<()> {
        let call_timeout = self.profile.call_timeout;
        match timeout(call_timeout, self.layer.cleanup()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(LayerError::Cleanup(msg))) => Err(LayerError::Cleanup(msg)),
            Ok(Err(other)) => Err(LayerError::Cleanup(other.to_string())),
            Err(_) => Err(LayerError::Cleanup(format!(
                "cleanup timed out after {call_timeout:?}"
            ))),
        }
    }
}

/// All registered layers, one serialized slot per kind
pub struct LayerPool {
    slots: BTreeMap<LayerKind, Arc<Mutex<LayerSlot>>>,
}

impl LayerPool {
    /// Register `layers`, taking each kind's profile from `config`
    ///
    /// Two layers of the same kind are rejected.
    pub fn new(layers: Vec<Box<dyn Layer>>, config: &ManagerConfig) -> ManagerResult<Self> {
        let mut slots = BTreeMap::new();

        for layer in layers {
            let kind = layer.kind();
            if slots.contains_key(&kind) {
                return Err(ManagerError::Config(format!(
                    "layer '{kind}' registered more than once"
                )));
            }
            let slot = LayerSlot::new(layer, config.profile(kind));
            slots.insert(kind, Arc::new(Mutex::new(slot)));
        }

        Ok(Self { slots })
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<LayerKind> {
        self.slots.keys().copied().collect()
    }

    #[must_use]
    pub fn contains(&self, kind: LayerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Wait for exclusive use of the layer of `kind`
    pub async fn acquire(&self, kind: LayerKind) -> ManagerResult<OwnedMutexGuard<LayerSlot>> {
        let slot = self
            .slots
            .get(&kind)
            .ok_or(ManagerError::InvalidLayer(kind))?;
        Ok(Arc::clone(slot).lock_owned().await)
    }

    /// Release every live layer
    ///
    /// Waits for in-flight calls on each slot, keeps going after failures and
    /// reports them in the result.
    pub async fn cleanup_all(&self) -> CleanupResult {
        let mut errors = Vec::new();

        for (kind, slot) in &self.slots {
            let mut slot = slot.lock().await;
            if !slot.live {
                debug!(layer = %kind, "Layer not live, nothing to clean up");
                continue;
            }
            match slot.release().await {
                Ok(()) => debug!(layer = %kind, "Layer cleaned up"),
                Err(e) => {
                    warn!(layer = %kind, "Failed to clean up layer: {e}");
                    errors.push(format!("{kind}: {e}"));
                }
            }
        }

        let result = CleanupResult::from_errors(errors);
        info!(?result, "Layer cleanup finished");
        result
    }
}

/// Spawns `cleanup_all` when dropped while still armed
///
/// Held by batch operations so an abandoned batch future still releases
/// its layers. Disarm it on every orderly exit.
pub struct PoolCleanupGuard {
    pool: Option<Arc<LayerPool>>,
}

impl PoolCleanupGuard {
    #[must_use]
    pub fn new(pool: Arc<LayerPool>) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn disarm(&mut self) {
        self.pool = None;
    }
}

impl Drop for PoolCleanupGuard {
    fn drop(&mut self) {
        let Some(pool) = self.pool.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!("Batch dropped before completion - scheduling layer cleanup");
                handle.spawn(async move {
                    pool.cleanup_all().await;
                });
            }
            Err(_) => warn!("Batch dropped outside a runtime - layer cleanup skipped"),
        }
    }
}
