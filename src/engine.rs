//! Cache Engine Assembly
//!
//! Wires the invocation pipeline, data container, global state manager and
//! lifecycle registry into one embeddable engine. Startup order is driven by
//! component priorities: persisted state restores before the pipeline opens
//! for traffic, and teardown runs symmetrically in reverse.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::command::{Command, CommandOutcome};
use crate::container::{DataContainer, InMemoryDataContainer};
use crate::context::InvocationContext;
use crate::error::{Error, Result};
use crate::globalstate::{GlobalStateManager, GlobalStateProvider, ScopedState};
use crate::lifecycle::{Lifecycle, LifecycleRegistry};
use crate::pipeline::{Interceptor, InterceptorChain, PipelineStats, StatsInterceptor};

/// Builder for [`CacheEngine`]
pub struct EngineBuilder {
    state_dir: Option<PathBuf>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    container: Option<Arc<dyn DataContainer>>,
    shutdown: CancellationToken,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Start with no persistence, the statistics interceptor and an
    /// in-memory container
    pub fn new() -> Self {
        Self {
            state_dir: None,
            interceptors: Vec::new(),
            container: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Persist restart state under the given directory
    #[must_use]
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// Append an interceptor after the built-in statistics interceptor
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Replace the default in-memory container
    #[must_use]
    pub fn container(mut self, container: Arc<dyn DataContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// The engine-wide shutdown token.
    ///
    /// Wire this into coordination interceptors before [`Self::build`] so
    /// engine stop can unblock any parked command.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Assemble the engine. The pipeline stays closed until
    /// [`CacheEngine::start`] runs.
    pub fn build(self) -> Result<CacheEngine> {
        let stats = Arc::new(PipelineStats::new());
        let mut chain_builder = InterceptorChain::builder()
            .append(Arc::new(StatsInterceptor::new(Arc::clone(&stats))));
        for interceptor in self.interceptors {
            chain_builder = chain_builder.append(interceptor);
        }
        let container = self
            .container
            .unwrap_or_else(|| Arc::new(InMemoryDataContainer::new()));
        let chain = Arc::new(chain_builder.build(container));

        let registry = LifecycleRegistry::new();
        let state_manager = match self.state_dir {
            Some(dir) => {
                let manager = Arc::new(GlobalStateManager::new(dir));
                manager.register_state_provider(Arc::new(PipelineStateProvider {
                    chain: Arc::clone(&chain),
                }));
                registry.register(Arc::clone(&manager) as Arc<dyn Lifecycle>)?;
                Some(manager)
            }
            None => None,
        };
        registry.register(Arc::new(PipelineLifecycle {
            chain: Arc::clone(&chain),
            state_manager: state_manager.clone(),
        }))?;

        Ok(CacheEngine {
            chain,
            stats,
            state_manager,
            registry,
            shutdown: self.shutdown,
        })
    }
}

/// An assembled cache engine instance
pub struct CacheEngine {
    chain: Arc<InterceptorChain>,
    stats: Arc<PipelineStats>,
    state_manager: Option<Arc<GlobalStateManager>>,
    registry: LifecycleRegistry,
    shutdown: CancellationToken,
}

impl CacheEngine {
    /// Start assembling an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// A non-persistent engine with the default stack (for embedding and
    /// tests)
    pub fn in_memory() -> Result<Self> {
        EngineBuilder::new().build()
    }

    /// Start all components in priority order and open the pipeline
    pub async fn start(&self) -> Result<()> {
        self.registry.start().await?;
        info!("cache engine started");
        Ok(())
    }

    /// Close the pipeline and stop components in reverse order.
    ///
    /// Cancels the engine shutdown token first so commands parked at a
    /// rendezvous unblock instead of hanging teardown.
    pub async fn stop(&self) -> Result<()> {
        self.shutdown.cancel();
        let result = self.registry.stop().await;
        info!("cache engine stopped");
        result
    }

    /// Dispatch one command with the given context
    pub async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
    ) -> Result<CommandOutcome> {
        self.chain.invoke(ctx, command).await
    }

    /// Dispatch one locally-originated command
    pub async fn invoke_local(&self, command: &Command) -> Result<CommandOutcome> {
        let mut ctx = InvocationContext::local();
        self.invoke(&mut ctx, command).await
    }

    /// The assembled pipeline
    pub fn chain(&self) -> Arc<InterceptorChain> {
        Arc::clone(&self.chain)
    }

    /// Live pipeline statistics
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// The state manager, when persistence is configured
    pub fn state_manager(&self) -> Option<Arc<GlobalStateManager>> {
        self.state_manager.clone()
    }

    /// The engine-wide shutdown token
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Opens the pipeline once dependencies are ready; closes it on stop
struct PipelineLifecycle {
    chain: Arc<InterceptorChain>,
    state_manager: Option<Arc<GlobalStateManager>>,
}

#[async_trait]
impl Lifecycle for PipelineLifecycle {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_ready(&self) -> bool {
        self.chain.is_accepting()
    }

    async fn start(&self) -> Result<()> {
        if let Some(manager) = &self.state_manager {
            if !manager.is_started() {
                return Err(Error::Lifecycle(
                    "global state not restored; refusing to accept invocations".to_string(),
                ));
            }
        }
        self.chain.set_accepting(true);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.chain.set_accepting(false);
        Ok(())
    }
}

/// Persists the interceptor configuration fingerprint across restarts
struct PipelineStateProvider {
    chain: Arc<InterceptorChain>,
}

impl GlobalStateProvider for PipelineStateProvider {
    fn prepare_for_restore(&self, state: &ScopedState) -> Result<()> {
        if let Some(previous) = state.property("pipeline.interceptors") {
            let current = self.chain.fingerprint();
            if previous != current {
                warn!(
                    previous,
                    current = %current,
                    "interceptor configuration changed since last shutdown"
                );
            }
        }
        Ok(())
    }

    fn prepare_for_persist(&self, state: &mut ScopedState) {
        state.set_property("pipeline.interceptors", self.chain.fingerprint());
    }
}
