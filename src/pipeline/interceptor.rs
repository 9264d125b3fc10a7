//! Interceptor Contract
//!
//! An interceptor is one pluggable unit of cross-cutting behavior. It
//! receives the invocation context, the command and an explicit continuation
//! representing "the rest of the chain plus the terminal handler", and
//! decides whether to act before delegating, after delegating, or to
//! short-circuit without delegating at all.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

use crate::command::{Command, CommandOutcome};
use crate::container::DataContainer;
use crate::context::InvocationContext;
use crate::error::{Error, Result};

/// One unit of cross-cutting behavior in the invocation pipeline.
///
/// The default implementation delegates unchanged, so an interceptor only
/// overrides `invoke` for the command kinds it cares about and behaves as a
/// pass-through for everything else.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Stable name used in logs and in the chain fingerprint
    fn name(&self) -> &'static str;

    /// Process one invocation.
    ///
    /// `next` is consumed by delegation; not invoking it short-circuits the
    /// rest of the chain and the terminal handler. Failures returned from
    /// `next` must be rethrown or deliberately translated, never dropped.
    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: NextInterceptor<'_>,
    ) -> Result<CommandOutcome> {
        next.invoke(ctx, command).await
    }
}

/// Continuation handed to an interceptor: the remaining interceptors followed
/// by the terminal handler.
///
/// Consuming `self` on delegation makes double-delegation unrepresentable.
pub struct NextInterceptor<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    terminal: &'a dyn DataContainer,
}

impl<'a> NextInterceptor<'a> {
    pub(crate) fn new(
        interceptors: &'a [Arc<dyn Interceptor>],
        terminal: &'a dyn DataContainer,
    ) -> Self {
        Self {
            interceptors,
            terminal,
        }
    }

    /// Invoke the remainder of the chain.
    ///
    /// When no interceptors remain, the terminal handler executes; its
    /// failures are wrapped as [`Error::Delegate`] preserving the cause.
    pub async fn invoke(
        self,
        ctx: &mut InvocationContext,
        command: &Command,
    ) -> Result<CommandOutcome> {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                trace!(
                    interceptor = head.name(),
                    kind = %command.kind(),
                    "delegating to interceptor"
                );
                head.invoke(ctx, command, NextInterceptor::new(rest, self.terminal))
                    .await
            }
            None => self
                .terminal
                .execute(ctx, command)
                .map_err(|cause| Error::delegate(command.kind(), cause)),
        }
    }
}
