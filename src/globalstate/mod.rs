//! Scoped Persistent State
//!
//! Process-restart persistent state, stored as one `<scope>.state` file per
//! subsystem scope under the configured persistent location. Each file holds
//! newline-delimited `key=value` records with `#`-prefixed comment lines
//! skipped; keys and values are unicode-escaped so that `=`, newlines and
//! non-ASCII characters round-trip exactly.
//!
//! The [`GlobalStateManager`] owns the provider registry for its lifetime:
//! components contribute restart metadata by registering a
//! [`GlobalStateProvider`], never through ambient global lookup.

mod escape;
mod manager;
#[cfg(test)]
mod proptest;
mod state;

pub use escape::{unicode_escape, unicode_unescape};
pub use manager::GlobalStateManager;
pub use state::{GlobalStateProvider, ScopedState, GLOBAL_SCOPE};
