//! Data Container - Terminal Handler
//!
//! The innermost stage of the invocation pipeline: the actual entry store.
//! The pipeline treats it as a black box `(context, command) -> outcome`
//! call; asynchronous wrapping, persistence and eviction are the container
//! implementation's concern.

use bytes::Bytes;
use dashmap::DashMap;

use crate::command::{CacheKey, Command, CommandOutcome, Flag};
use crate::context::InvocationContext;
use crate::error::Result;

/// Terminal handler executing commands against the entry store.
///
/// Implementations must be safe to call concurrently from many invocations.
/// The call is synchronous from the pipeline's viewpoint.
pub trait DataContainer: Send + Sync {
    /// Execute a validated command and produce its outcome
    fn execute(&self, ctx: &InvocationContext, command: &Command) -> Result<CommandOutcome>;

    /// Number of entries currently stored
    fn len(&self) -> usize;

    /// True when no entries are stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory container backed by a sharded concurrent map.
///
/// The default terminal for embedded nodes and tests.
#[derive(Debug, Default)]
pub struct InMemoryDataContainer {
    entries: DashMap<CacheKey, Bytes>,
}

impl InMemoryDataContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    fn previous(ctx: &InvocationContext, command: &Command, prev: Option<Bytes>) -> CommandOutcome {
        let flags = command.flags().union(ctx.flags());
        if flags.contains(Flag::IgnoreReturnValue) {
            CommandOutcome::Value(None)
        } else {
            CommandOutcome::Value(prev)
        }
    }
}

impl DataContainer for InMemoryDataContainer {
    fn execute(&self, ctx: &InvocationContext, command: &Command) -> Result<CommandOutcome> {
        match command {
            Command::Get { key, .. } => {
                let value = self.entries.get(key).map(|entry| entry.value().clone());
                Ok(CommandOutcome::Value(value))
            }
            Command::Put { key, value, .. } => {
                let prev = self.entries.insert(key.clone(), value.clone());
                Ok(Self::previous(ctx, command, prev))
            }
            Command::Remove { key, expected, .. } => match expected {
                None => {
                    let prev = self.entries.remove(key).map(|(_, v)| v);
                    Ok(Self::previous(ctx, command, prev))
                }
                Some(expected) => {
                    let removed = self
                        .entries
                        .remove_if(key, |_, current| current == expected)
                        .is_some();
                    Ok(CommandOutcome::Applied(removed))
                }
            },
            Command::Replace {
                key,
                expected,
                value,
                ..
            } => {
                // Entry-level lock held for the whole compare-and-set
                match self.entries.get_mut(key) {
                    None => Ok(match expected {
                        None => CommandOutcome::Value(None),
                        Some(_) => CommandOutcome::Applied(false),
                    }),
                    Some(mut entry) => match expected {
                        None => {
                            let prev = std::mem::replace(entry.value_mut(), value.clone());
                            Ok(Self::previous(ctx, command, Some(prev)))
                        }
                        Some(expected) => {
                            if entry.value() == expected {
                                *entry.value_mut() = value.clone();
                                Ok(CommandOutcome::Applied(true))
                            } else {
                                Ok(CommandOutcome::Applied(false))
                            }
                        }
                    },
                }
            }
            Command::Compute { key, function, .. } => {
                match self.entries.get_mut(key) {
                    Some(mut entry) => {
                        let next = function.apply(Some(entry.value()))?;
                        match next {
                            Some(next) => {
                                *entry.value_mut() = next.clone();
                                Ok(CommandOutcome::Value(Some(next)))
                            }
                            None => {
                                drop(entry);
                                self.entries.remove(key);
                                Ok(CommandOutcome::Value(None))
                            }
                        }
                    }
                    None => {
                        let next = function.apply(None)?;
                        if let Some(next) = &next {
                            self.entries.insert(key.clone(), next.clone());
                        }
                        Ok(CommandOutcome::Value(next))
                    }
                }
            }
            Command::Clear { .. } => {
                self.entries.clear();
                Ok(CommandOutcome::Done)
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
