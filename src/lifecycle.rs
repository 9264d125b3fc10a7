//! Component Lifecycle
//!
//! Pipeline-adjacent components start and stop in a fixed relative order:
//! each declares a priority (lower starts first), and the registry drives
//! startup in ascending priority order with symmetric teardown in reverse.
//! A component only starts once every earlier component reports ready, so
//! e.g. state restoration always precedes the pipeline accepting traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// A component with ordered start/stop hooks
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Stable component name for logs and error messages
    fn name(&self) -> &'static str;

    /// Start ordering: lower priorities start first, stop last
    fn priority(&self) -> i32;

    /// Whether the component is ready to serve dependents.
    ///
    /// Checked for every earlier component before a later one starts.
    fn is_ready(&self) -> bool {
        true
    }

    /// Startup hook
    async fn start(&self) -> Result<()>;

    /// Teardown hook
    async fn stop(&self) -> Result<()>;
}

/// Drives registered components through start/stop in priority order
#[derive(Default)]
pub struct LifecycleRegistry {
    components: Mutex<Vec<Arc<dyn Lifecycle>>>,
    running: AtomicBool,
}

impl LifecycleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component. Only allowed while stopped.
    pub fn register(&self, component: Arc<dyn Lifecycle>) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            return Err(Error::Lifecycle(
                "cannot register components while running".to_string(),
            ));
        }
        self.components.lock().push(component);
        Ok(())
    }

    /// Whether start completed and stop has not run
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start all components in ascending priority order.
    ///
    /// A start failure stops the already-started components in reverse order
    /// before surfacing the error.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::Lifecycle("registry already started".to_string()));
        }
        let components = self.sorted_components();
        for (idx, component) in components.iter().enumerate() {
            for prior in &components[..idx] {
                if !prior.is_ready() {
                    self.rollback(&components[..idx]).await;
                    self.running.store(false, Ordering::Release);
                    return Err(Error::Lifecycle(format!(
                        "component '{}' is not ready; refusing to start '{}'",
                        prior.name(),
                        component.name()
                    )));
                }
            }
            debug!(
                component = component.name(),
                priority = component.priority(),
                "starting component"
            );
            if let Err(err) = component.start().await {
                error!(component = component.name(), %err, "component failed to start");
                self.rollback(&components[..idx]).await;
                self.running.store(false, Ordering::Release);
                return Err(err);
            }
        }
        info!(components = components.len(), "all components started");
        Ok(())
    }

    /// Stop all components in reverse priority order.
    ///
    /// Every component's stop hook is attempted; the first failure is
    /// surfaced after the sweep completes.
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let components = self.sorted_components();
        let mut first_failure = None;
        for component in components.iter().rev() {
            debug!(
                component = component.name(),
                priority = component.priority(),
                "stopping component"
            );
            if let Err(err) = component.stop().await {
                warn!(component = component.name(), %err, "component failed to stop");
                first_failure.get_or_insert(err);
            }
        }
        match first_failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn sorted_components(&self) -> Vec<Arc<dyn Lifecycle>> {
        let mut components = self.components.lock().clone();
        components.sort_by_key(|c| c.priority());
        components
    }

    async fn rollback(&self, started: &[Arc<dyn Lifecycle>]) {
        for component in started.iter().rev() {
            if let Err(err) = component.stop().await {
                warn!(component = component.name(), %err, "rollback stop failed");
            }
        }
    }
}
