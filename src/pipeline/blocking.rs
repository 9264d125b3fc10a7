//! Blocking Interceptor
//!
//! Coordination interceptor that pauses a matching command at a rendezvous
//! barrier until an external controller releases it. Used by test harnesses
//! and administrative pauses to line up live traffic with a controlling
//! task.
//!
//! Matching is first-blocker-wins: additional matching commands arriving
//! while one is parked are not tracked separately; they simply take part in
//! later rendezvous cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::command::{Command, CommandKind, CommandOutcome};
use crate::context::InvocationContext;
use crate::error::{Error, Result};

use super::interceptor::{Interceptor, NextInterceptor};
use super::rendezvous::RendezvousBarrier;

/// Pauses matching commands at a shared [`RendezvousBarrier`]
pub struct BlockingInterceptor {
    barrier: Arc<RendezvousBarrier>,
    kind: CommandKind,
    block_after: bool,
    origin_local_only: bool,
    suspended: AtomicBool,
    shutdown: CancellationToken,
}

impl BlockingInterceptor {
    /// Intercept commands of `kind`, pausing before or after delegation.
    ///
    /// With `origin_local_only`, remotely-delivered matching commands pass
    /// through unblocked.
    pub fn new(
        barrier: Arc<RendezvousBarrier>,
        kind: CommandKind,
        block_after: bool,
        origin_local_only: bool,
    ) -> Self {
        Self {
            barrier,
            kind,
            block_after,
            origin_local_only,
            suspended: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie the rendezvous wait to an external shutdown signal.
    ///
    /// Cancelling the token unblocks any parked command with
    /// [`Error::CoordinationBroken`] and breaks the barrier for its peer.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Toggle whether matching is bypassed entirely.
    ///
    /// Atomic; a stale read only affects whether that particular invocation
    /// blocks, never overall correctness, so in-flight commands are
    /// unaffected.
    pub fn suspend(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Relaxed);
        trace!(suspended, kind = %self.kind, "blocking interceptor suspend toggled");
    }

    fn matches(&self, ctx: &InvocationContext, command: &Command) -> bool {
        command.kind() == self.kind && (!self.origin_local_only || ctx.is_origin_local())
    }

    async fn block_if_needed(&self, ctx: &InvocationContext, command: &Command) -> Result<()> {
        if self.suspended.load(Ordering::Relaxed) {
            trace!(kind = %command.kind(), "suspended, not blocking command");
            return Ok(());
        }
        if !self.matches(ctx, command) {
            return Ok(());
        }
        trace!(
            kind = %command.kind(),
            phase = if self.block_after { "after" } else { "before" },
            "command blocking at rendezvous"
        );
        // First cycle synchronizes with the controller, second waits for
        // release
        for _ in 0..2 {
            tokio::select! {
                arrived = self.barrier.arrive() => arrived?,
                _ = self.shutdown.cancelled() => {
                    self.barrier.break_barrier();
                    return Err(Error::CoordinationBroken(
                        "cancelled while parked at rendezvous".to_string(),
                    ));
                }
            }
        }
        trace!(kind = %command.kind(), "command released from rendezvous");
        Ok(())
    }
}

#[async_trait]
impl Interceptor for BlockingInterceptor {
    fn name(&self) -> &'static str {
        "blocking"
    }

    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: NextInterceptor<'_>,
    ) -> Result<CommandOutcome> {
        if !self.block_after {
            self.block_if_needed(ctx, command).await?;
            return next.invoke(ctx, command).await;
        }
        let result = next.invoke(ctx, command).await;
        // Runs whether or not the delegate failed; a coordination failure
        // here takes precedence over the delegate's outcome
        self.block_if_needed(ctx, command).await?;
        result
    }
}
