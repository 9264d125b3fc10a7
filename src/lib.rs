//! MeshCache - Clustered Cache Engine Invocation Core
//!
//! Every read, write and administrative operation against the cache is
//! represented as a command that passes through an ordered, extensible
//! pipeline of interceptors before taking effect. The pipeline guarantees
//! deterministic ordering of cross-cutting concerns, supports origin-aware
//! routing of locally-issued vs. remotely-delivered commands, allows safe
//! runtime suspension for coordination and testing, and propagates failures
//! without corrupting cache state.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ Command + InvocationContext
//!                 │
//!                 ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Interceptor Chain                      │
//! │  stats ─▶ (blocking) ─▶ … ─▶ DataContainer (terminal)     │
//! │    ◀────────── results / failures unwind ──────────       │
//! └───────────────────────────────────────────────────────────┘
//!                 │
//!                 ▼
//!        CommandOutcome or typed Error
//! ```
//!
//! Lifecycle-ordered components (global state restore before the pipeline
//! opens) are driven by the [`lifecycle::LifecycleRegistry`];
//! [`globalstate::GlobalStateManager`] persists restart metadata as escaped
//! `key=value` records per scope.
//!
//! # Modules
//!
//! - [`command`] - Closed command variants, flags, outcomes and keys
//! - [`config`] - Client configuration builder and validation
//! - [`container`] - Terminal handler trait and the in-memory container
//! - [`context`] - Per-invocation context (origin, correlation, attributes)
//! - [`engine`] - Engine assembly: pipeline + state + lifecycle
//! - [`error`] - Error taxonomy
//! - [`globalstate`] - Scoped persistent state across restarts
//! - [`lifecycle`] - Priority-ordered start/stop driver
//! - [`pipeline`] - Interceptor chain, rendezvous barrier, interceptors
//! - [`scripting`] - Named scripts executed through the pipeline

pub mod command;
pub mod config;
pub mod container;
pub mod context;
pub mod engine;
pub mod error;
pub mod globalstate;
pub mod lifecycle;
pub mod pipeline;
pub mod scripting;

// Re-export commonly used types
pub use command::{CacheKey, Command, CommandKind, CommandOutcome, ComputeFn, Flag, FlagSet};
pub use config::{Configuration, ConfigurationBuilder};
pub use container::{DataContainer, InMemoryDataContainer};
pub use context::{InvocationContext, NodeId, Origin};
pub use engine::{CacheEngine, EngineBuilder};
pub use error::{Error, Result};
pub use pipeline::{
    BlockingInterceptor, ChainBuilder, Interceptor, InterceptorChain, NextInterceptor,
    RendezvousBarrier, StatsInterceptor,
};
pub use scripting::{ScriptingManager, TaskContext};
