//! Interceptor Chain - Assembly and Dispatch
//!
//! The chain holds the ordered interceptor sequence, fixed at configuration
//! time, and exposes the single invocation entry point. Every invocation
//! traverses the same sequence; an interceptor is skipped only when an
//! earlier one short-circuits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::command::{Command, CommandOutcome};
use crate::container::DataContainer;
use crate::context::InvocationContext;
use crate::error::{Error, Result};

use super::interceptor::{Interceptor, NextInterceptor};

/// Ordered invocation pipeline dispatching commands to the terminal handler
pub struct InterceptorChain {
    /// Read-only after assembly; reconfiguration requires a restart
    interceptors: Vec<Arc<dyn Interceptor>>,
    terminal: Arc<dyn DataContainer>,
    accepting: AtomicBool,
}

impl InterceptorChain {
    /// Start assembling a chain
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// Dispatch one command through the pipeline.
    ///
    /// Validates the command, traverses the interceptors in configured order
    /// and returns the terminal handler's outcome (or the short-circuiting
    /// interceptor's), with failures propagated back through every enclosing
    /// interceptor.
    pub async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
    ) -> Result<CommandOutcome> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(Error::Lifecycle(
                "invocation pipeline is not accepting commands".to_string(),
            ));
        }
        command.validate()?;
        trace!(kind = %command.kind(), origin = ?ctx.origin(), "entering interceptor chain");
        NextInterceptor::new(&self.interceptors, self.terminal.as_ref())
            .invoke(ctx, command)
            .await
    }

    /// Lifecycle hook: open or close the pipeline for invocations
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
        debug!(accepting, "pipeline accepting state changed");
    }

    /// Whether invocations are currently admitted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Number of configured interceptors
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// True when no interceptors are configured
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Configured interceptor names, in order
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Stable fingerprint of the configured sequence, persisted across
    /// restarts as pipeline metadata
    pub fn fingerprint(&self) -> String {
        self.interceptor_names().join(",")
    }
}

/// Builder collecting interceptors in invocation order
#[derive(Default)]
pub struct ChainBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainBuilder")
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ChainBuilder {
    /// Append an interceptor after all currently configured ones
    #[must_use]
    pub fn append(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Insert an interceptor immediately before the named one.
    ///
    /// Fails when no configured interceptor carries that name.
    pub fn insert_before(
        mut self,
        name: &str,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<Self> {
        match self.interceptors.iter().position(|i| i.name() == name) {
            Some(idx) => {
                self.interceptors.insert(idx, interceptor);
                Ok(self)
            }
            None => Err(Error::Configuration(format!(
                "no interceptor named '{}' in the chain",
                name
            ))),
        }
    }

    /// Finish assembly against the given terminal handler.
    ///
    /// The chain starts closed; the owning lifecycle opens it once dependency
    /// components report ready.
    pub fn build(self, terminal: Arc<dyn DataContainer>) -> InterceptorChain {
        InterceptorChain {
            interceptors: self.interceptors,
            terminal,
            accepting: AtomicBool::new(false),
        }
    }
}
