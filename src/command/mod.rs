//! Command Data Model
//!
//! Every cache operation is described by an immutable [`Command`] built per
//! invocation. The variant set is closed: interceptors and the terminal
//! handler dispatch over [`CommandKind`] with exhaustive matching, so adding
//! an operation is a compile-time-checked, total change.
//!
//! # Design Principles
//!
//! - Closed tagged-variant enumeration instead of open dynamic dispatch
//! - Zero-copy keys and values via [`bytes::Bytes`]
//! - Execution modifiers carried as a compact [`FlagSet`]

mod flags;
mod ops;
mod types;

pub use flags::{Flag, FlagSet};
pub use ops::{Command, CommandKind, ComputeFn};
pub use types::{CacheKey, CommandOutcome};
