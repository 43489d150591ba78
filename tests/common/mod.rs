//! Test utilities shared by the patentscout integration tests
//!
//! `ScriptedLayer` is an in-memory backend whose answers are queued or
//! computed per query, with a `LayerProbe` handle for assertions after the
//! layer has been moved into a manager.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use kodegen_tools_patentscout::{
    CrawlerManager, Layer, LayerError, LayerKind, LayerProfile, LayerResult, LayerStrategyTable,
    ManagerConfig, ManagerConfigBuilder, RetrySettings, TargetSource,
};

/// One scripted answer
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    Ids(Vec<String>),
    Fail(LayerError),
    /// Answer only after the given delay
    Slow(Duration, Vec<String>),
}

#[allow(dead_code)]
impl Reply {
    pub fn ids(ids: &[&str]) -> Self {
        Self::Ids(ids.iter().map(|s| (*s).to_string()).collect())
    }

    pub fn empty() -> Self {
        Self::Ids(Vec::new())
    }

    pub fn blocked() -> Self {
        Self::Fail(LayerError::Blocked("unusual traffic".into()))
    }

    pub fn protocol() -> Self {
        Self::Fail(LayerError::Protocol("connection reset".into()))
    }
}

type Responder = Box<dyn Fn(TargetSource, &str) -> Reply + Send + Sync>;

#[derive(Default)]
struct ProbeState {
    script: VecDeque<Reply>,
    responder: Option<Responder>,
    fail_init: bool,
    calls: Vec<(TargetSource, String)>,
    inits: usize,
    cleanups: usize,
    active: usize,
    max_active: usize,
}

/// Shared view of a `ScriptedLayer`
#[derive(Clone, Default)]
pub struct LayerProbe(Arc<Mutex<ProbeState>>);

#[allow(dead_code)]
impl LayerProbe {
    /// Queue an answer; queued answers win over the responder
    pub fn push(&self, reply: Reply) -> &Self {
        self.0.lock().script.push_back(reply);
        self
    }

    /// Compute answers once the queue is drained
    pub fn respond_with(&self, responder: impl Fn(TargetSource, &str) -> Reply + Send + Sync + 'static) {
        self.0.lock().responder = Some(Box::new(responder));
    }

    pub fn fail_init(&self, fail: bool) {
        self.0.lock().fail_init = fail;
    }

    pub fn calls(&self) -> usize {
        self.0.lock().calls.len()
    }

    pub fn queries(&self) -> Vec<(TargetSource, String)> {
        self.0.lock().calls.clone()
    }

    pub fn inits(&self) -> usize {
        self.0.lock().inits
    }

    pub fn cleanups(&self) -> usize {
        self.0.lock().cleanups
    }

    /// Most searches that were running on this layer at the same time
    pub fn max_active(&self) -> usize {
        self.0.lock().max_active
    }

    fn initialize(&self) -> LayerResult<()> {
        let mut state = self.0.lock();
        state.inits += 1;
        if state.fail_init {
            Err(LayerError::Init("browser executable not found".into()))
        } else {
            Ok(())
        }
    }

    fn cleanup(&self) {
        self.0.lock().cleanups += 1;
    }

    fn begin(&self, target: TargetSource, query: &str) -> Reply {
        let mut state = self.0.lock();
        state.calls.push((target, query.to_string()));
        state.active += 1;
        state.max_active = state.max_active.max(state.active);

        if let Some(reply) = state.script.pop_front() {
            return reply;
        }
        match &state.responder {
            Some(responder) => responder(target, query),
            None => Reply::empty(),
        }
    }

    fn end(&self) {
        let mut state = self.0.lock();
        state.active = state.active.saturating_sub(1);
    }
}

/// Sets `active` back when the search future finishes or is dropped
struct ActiveGuard(LayerProbe);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.end();
    }
}

pub struct ScriptedLayer {
    kind: LayerKind,
    probe: LayerProbe,
}

impl Layer for ScriptedLayer {
    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn initialize<'a>(&'a mut self, _profile: &'a LayerProfile) -> BoxFuture<'a, LayerResult<()>> {
        let result = self.probe.initialize();
        Box::pin(async move { result })
    }

    fn search<'a>(
        &'a mut self,
        target: TargetSource,
        query: &'a str,
        _max_results: usize,
    ) -> BoxFuture<'a, LayerResult<Vec<String>>> {
        let reply = self.probe.begin(target, query);
        let guard = ActiveGuard(self.probe.clone());
        Box::pin(async move {
            let _guard = guard;
            match reply {
                Reply::Ids(ids) => Ok(ids),
                Reply::Fail(error) => Err(error),
                Reply::Slow(delay, ids) => {
                    tokio::time::sleep(delay).await;
                    Ok(ids)
                }
            }
        })
    }

    fn cleanup<'a>(&'a mut self) -> BoxFuture<'a, LayerResult<()>> {
        self.probe.cleanup();
        Box::pin(async { Ok(()) })
    }
}

/// A scripted layer of `kind`, boxed for the manager, plus its probe
#[allow(dead_code)]
pub fn scripted(kind: LayerKind) -> (Box<dyn Layer>, LayerProbe) {
    let probe = LayerProbe::default();
    let layer = ScriptedLayer {
        kind,
        probe: probe.clone(),
    };
    (Box::new(layer), probe)
}

/// Config without politeness delays and with short backoff
#[allow(dead_code)]
pub fn test_config() -> ManagerConfigBuilder {
    ManagerConfig::builder()
        .without_politeness()
        .retry(RetrySettings {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        })
}

/// Strategy with a single target and the given order
#[allow(dead_code)]
pub fn strategy(target: TargetSource, order: &[LayerKind]) -> LayerStrategyTable {
    LayerStrategyTable::empty()
        .with_order(target, order.to_vec())
        .expect("test strategy should be valid")
}

/// Manager over scripted layers of `kinds`, probes in the same order
#[allow(dead_code)]
pub fn manager_with(
    config: ManagerConfigBuilder,
    strategy: LayerStrategyTable,
    kinds: &[LayerKind],
) -> (CrawlerManager, Vec<LayerProbe>) {
    let (layers, probes): (Vec<_>, Vec<_>) = kinds.iter().map(|kind| scripted(*kind)).unzip();
    let config = config.build().expect("test config should be valid");
    let manager = CrawlerManager::new(config, strategy, layers).expect("test manager should build");
    (manager, probes)
}

/// Route test logs through the test harness; `RUST_LOG` selects the level
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
