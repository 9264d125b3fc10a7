//! Invocation Pipeline
//!
//! Every cache operation passes through an ordered chain of interceptors
//! before reaching the data container. The chain guarantees deterministic
//! ordering of cross-cutting concerns and propagates failures without
//! corrupting cache state.
//!
//! # Architecture
//!
//! ```text
//! chain.invoke(ctx, cmd)
//!        │
//!        ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Interceptor 0 │──▶│ Interceptor 1 │──▶│ Interceptor N │──▶│ Container │
//! │ (outermost)  │◀──│              │◀──│ (innermost)  │◀──│ (terminal)│
//! └──────────────┘   └──────────────┘   └──────────────┘   └───────────┘
//! ```
//!
//! Before-actions run in configured forward order, after-actions unwind in
//! reverse (nested-call semantics). An interceptor delegates through an
//! explicit continuation value; consuming the continuation at most once is
//! enforced by the type system.
//!
//! # Concurrency
//!
//! The assembled chain is stateless across invocations and shared read-only
//! by all invoking tasks. Interceptors holding mutable shared state (the
//! rendezvous barrier, the suspend flag) synchronize it themselves with
//! atomic primitives.

mod blocking;
mod chain;
mod interceptor;
mod rendezvous;
mod stats;

pub use blocking::BlockingInterceptor;
pub use chain::{ChainBuilder, InterceptorChain};
pub use interceptor::{Interceptor, NextInterceptor};
pub use rendezvous::RendezvousBarrier;
pub use stats::{PipelineStats, StatsInterceptor, StatsSnapshot};
