//! Statistics Interceptor
//!
//! Records per-invocation statistics after delegation: hit/miss counts for
//! reads, write/remove/clear counts, failures, and exponential-moving-average
//! latencies. Invocations carrying `SkipStatistics` bypass recording.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

use crate::command::{Command, CommandKind, CommandOutcome, Flag};
use crate::context::InvocationContext;
use crate::error::Result;

use super::interceptor::{Interceptor, NextInterceptor};

/// Pipeline statistics collector
#[derive(Debug, Default)]
pub struct PipelineStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    removals: AtomicU64,
    clears: AtomicU64,
    failures: AtomicU64,

    // Latencies in microseconds, exponential moving average
    read_latency_us: AtomicU64,
    write_latency_us: AtomicU64,
}

impl PipelineStats {
    /// Create a new statistics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stores(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }

    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    pub fn clears(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Read hit ratio in [0.0, 1.0]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Smoothed read latency
    pub fn read_latency(&self) -> Duration {
        Duration::from_micros(self.read_latency_us.load(Ordering::Relaxed))
    }

    /// Smoothed write latency
    pub fn write_latency(&self) -> Duration {
        Duration::from_micros(self.write_latency_us.load(Ordering::Relaxed))
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            stores: self.stores(),
            removals: self.removals(),
            clears: self.clears(),
            failures: self.failures(),
            hit_ratio: self.hit_ratio(),
            read_latency_us: self.read_latency_us.load(Ordering::Relaxed),
            write_latency_us: self.write_latency_us.load(Ordering::Relaxed),
        }
    }

    fn record_outcome(&self, command: &Command, outcome: &CommandOutcome, elapsed: Duration) {
        match command.kind() {
            CommandKind::Get => {
                if outcome.value().is_some() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                }
                self.update_latency_ema(&self.read_latency_us, elapsed);
            }
            CommandKind::Put | CommandKind::Replace | CommandKind::Compute => {
                self.stores.fetch_add(1, Ordering::Relaxed);
                self.update_latency_ema(&self.write_latency_us, elapsed);
            }
            CommandKind::Remove => {
                self.removals.fetch_add(1, Ordering::Relaxed);
                self.update_latency_ema(&self.write_latency_us, elapsed);
            }
            CommandKind::Clear => {
                self.clears.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn update_latency_ema(&self, target: &AtomicU64, duration: Duration) {
        let new_us = duration.as_micros() as u64;
        let alpha = 0.1; // EMA smoothing factor

        loop {
            let current = target.load(Ordering::Relaxed);
            let updated = if current == 0 {
                new_us
            } else {
                ((1.0 - alpha) * current as f64 + alpha * new_us as f64) as u64
            };

            if target
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }
}

/// Serializable copy of the pipeline counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub removals: u64,
    pub clears: u64,
    pub failures: u64,
    pub hit_ratio: f64,
    pub read_latency_us: u64,
    pub write_latency_us: u64,
}

/// Interceptor feeding [`PipelineStats`] from live traffic
pub struct StatsInterceptor {
    stats: Arc<PipelineStats>,
}

impl StatsInterceptor {
    /// Record into the given collector
    pub fn new(stats: Arc<PipelineStats>) -> Self {
        Self { stats }
    }

    /// The collector this interceptor feeds
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Interceptor for StatsInterceptor {
    fn name(&self) -> &'static str {
        "stats"
    }

    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: NextInterceptor<'_>,
    ) -> Result<CommandOutcome> {
        if command.flags().union(ctx.flags()).contains(Flag::SkipStatistics) {
            return next.invoke(ctx, command).await;
        }

        let start = Instant::now();
        let result = next.invoke(ctx, command).await;
        match &result {
            Ok(outcome) => self.stats.record_outcome(command, outcome, start.elapsed()),
            Err(_) => self.stats.record_failure(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FlagSet;
    use crate::container::InMemoryDataContainer;
    use crate::pipeline::InterceptorChain;

    fn stats_chain() -> (Arc<InterceptorChain>, Arc<PipelineStats>) {
        let stats = Arc::new(PipelineStats::new());
        let chain = InterceptorChain::builder()
            .append(Arc::new(StatsInterceptor::new(Arc::clone(&stats))))
            .build(Arc::new(InMemoryDataContainer::new()));
        chain.set_accepting(true);
        (Arc::new(chain), stats)
    }

    #[tokio::test]
    async fn test_hits_and_misses() {
        let (chain, stats) = stats_chain();
        let mut ctx = InvocationContext::local();

        chain.invoke(&mut ctx, &Command::get("k")).await.unwrap();
        chain
            .invoke(&mut ctx, &Command::put("k", "v"))
            .await
            .unwrap();
        chain.invoke(&mut ctx, &Command::get("k")).await.unwrap();

        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.stores(), 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_skip_statistics_flag() {
        let (chain, stats) = stats_chain();
        let mut ctx =
            InvocationContext::local().with_flags(FlagSet::from(Flag::SkipStatistics));

        chain.invoke(&mut ctx, &Command::get("k")).await.unwrap();
        assert_eq!(stats.misses(), 0);
    }

    #[tokio::test]
    async fn test_remove_and_clear_counters() {
        let (chain, stats) = stats_chain();
        let mut ctx = InvocationContext::local();

        chain
            .invoke(&mut ctx, &Command::put("k", "v"))
            .await
            .unwrap();
        chain.invoke(&mut ctx, &Command::remove("k")).await.unwrap();
        chain.invoke(&mut ctx, &Command::clear()).await.unwrap();

        assert_eq!(stats.removals(), 1);
        assert_eq!(stats.clears(), 1);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.stores, 1);
        assert_eq!(snapshot.failures, 0);
    }
}
