//! Cache Operation Commands
//!
//! The closed set of operations the invocation pipeline understands. A
//! [`Command`] is built per operation and is immutable once dispatched.

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

use super::flags::FlagSet;
use super::types::CacheKey;

/// Variant tag for dispatching over command kinds without inspecting payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Get,
    Put,
    Remove,
    Replace,
    Compute,
    Clear,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Get => "Get",
            CommandKind::Put => "Put",
            CommandKind::Remove => "Remove",
            CommandKind::Replace => "Replace",
            CommandKind::Compute => "Compute",
            CommandKind::Clear => "Clear",
        };
        f.write_str(name)
    }
}

/// Closed set of value transformations for `Compute` commands.
///
/// Transformations are named variants rather than opaque closures so that
/// remote delivery and replay stay deterministic and dispatch stays
/// exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeFn {
    /// Add a signed delta to the current value, interpreted as an ASCII
    /// decimal integer; an absent value counts as zero
    Increment(i64),
    /// Append bytes to the current value; an absent value counts as empty
    Append(Bytes),
    /// Install the value only when the entry is absent
    SetIfAbsent(Bytes),
}

impl ComputeFn {
    /// Apply the transformation to the current value, returning the value to
    /// store. `None` means the entry stays absent.
    pub fn apply(&self, current: Option<&Bytes>) -> Result<Option<Bytes>> {
        match self {
            ComputeFn::Increment(delta) => {
                let base = match current {
                    None => 0i64,
                    Some(bytes) => std::str::from_utf8(bytes)
                        .ok()
                        .and_then(|s| s.trim().parse::<i64>().ok())
                        .ok_or_else(|| {
                            Error::Internal(format!(
                                "existing value is not an integer counter ({} bytes)",
                                bytes.len()
                            ))
                        })?,
                };
                let next = base.checked_add(*delta).ok_or_else(|| {
                    Error::Internal(format!("counter overflow applying delta {}", delta))
                })?;
                Ok(Some(Bytes::from(next.to_string())))
            }
            ComputeFn::Append(suffix) => {
                let mut merged = Vec::with_capacity(
                    current.map(|c| c.len()).unwrap_or(0) + suffix.len(),
                );
                if let Some(current) = current {
                    merged.extend_from_slice(current);
                }
                merged.extend_from_slice(suffix);
                Ok(Some(Bytes::from(merged)))
            }
            ComputeFn::SetIfAbsent(value) => match current {
                Some(existing) => Ok(Some(existing.clone())),
                None => Ok(Some(value.clone())),
            },
        }
    }
}

/// One cache operation and its parameters.
///
/// Immutable once dispatched; a fresh command is built per invocation.
#[derive(Debug, Clone)]
pub enum Command {
    /// Read one entry
    Get { key: CacheKey, flags: FlagSet },
    /// Store a value, unconditionally
    Put {
        key: CacheKey,
        value: Bytes,
        flags: FlagSet,
    },
    /// Remove an entry; with `expected` set, only when the current value
    /// matches
    Remove {
        key: CacheKey,
        expected: Option<Bytes>,
        flags: FlagSet,
    },
    /// Replace an existing entry; with `expected` set, only when the current
    /// value matches
    Replace {
        key: CacheKey,
        expected: Option<Bytes>,
        value: Bytes,
        flags: FlagSet,
    },
    /// Transform an entry in place
    Compute {
        key: CacheKey,
        function: ComputeFn,
        flags: FlagSet,
    },
    /// Drop every entry
    Clear { flags: FlagSet },
}

impl Command {
    /// Convenience constructor for a flagless `Get`
    pub fn get(key: impl Into<CacheKey>) -> Self {
        Command::Get {
            key: key.into(),
            flags: FlagSet::EMPTY,
        }
    }

    /// Convenience constructor for a flagless `Put`
    pub fn put(key: impl Into<CacheKey>, value: impl Into<Bytes>) -> Self {
        Command::Put {
            key: key.into(),
            value: value.into(),
            flags: FlagSet::EMPTY,
        }
    }

    /// Convenience constructor for an unconditional `Remove`
    pub fn remove(key: impl Into<CacheKey>) -> Self {
        Command::Remove {
            key: key.into(),
            expected: None,
            flags: FlagSet::EMPTY,
        }
    }

    /// Convenience constructor for a flagless `Clear`
    pub fn clear() -> Self {
        Command::Clear {
            flags: FlagSet::EMPTY,
        }
    }

    /// The variant tag of this command
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Get { .. } => CommandKind::Get,
            Command::Put { .. } => CommandKind::Put,
            Command::Remove { .. } => CommandKind::Remove,
            Command::Replace { .. } => CommandKind::Replace,
            Command::Compute { .. } => CommandKind::Compute,
            Command::Clear { .. } => CommandKind::Clear,
        }
    }

    /// The key this command operates on, when keyed
    pub fn key(&self) -> Option<&CacheKey> {
        match self {
            Command::Get { key, .. }
            | Command::Put { key, .. }
            | Command::Remove { key, .. }
            | Command::Replace { key, .. }
            | Command::Compute { key, .. } => Some(key),
            Command::Clear { .. } => None,
        }
    }

    /// The command-level flag set
    pub fn flags(&self) -> FlagSet {
        match self {
            Command::Get { flags, .. }
            | Command::Put { flags, .. }
            | Command::Remove { flags, .. }
            | Command::Replace { flags, .. }
            | Command::Compute { flags, .. }
            | Command::Clear { flags } => *flags,
        }
    }

    /// Whether this command mutates cache state
    pub fn is_write(&self) -> bool {
        !matches!(self, Command::Get { .. })
    }

    /// Validate structural invariants before the command enters the chain.
    ///
    /// Keyed operations require a non-empty key.
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.key() {
            if key.is_empty() {
                return Err(Error::Validation(format!(
                    "{} command requires a non-empty key",
                    self.kind()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::command::Flag;

    #[test]
    fn test_kind_and_key_accessors() {
        let cmd = Command::put("k", "v");
        assert_eq!(cmd.kind(), CommandKind::Put);
        assert_eq!(cmd.key().unwrap().as_bytes(), b"k");
        assert!(cmd.is_write());
        assert!(Command::clear().key().is_none());
        assert!(!Command::get("k").is_write());
    }

    #[test]
    fn test_empty_key_fails_validation() {
        let cmd = Command::get("");
        assert_matches!(cmd.validate(), Err(Error::Validation(_)));
        assert_matches!(Command::clear().validate(), Ok(()));
    }

    #[test]
    fn test_flags_accessor() {
        let cmd = Command::Get {
            key: "k".into(),
            flags: FlagSet::from(Flag::SkipStatistics),
        };
        assert!(cmd.flags().contains(Flag::SkipStatistics));
    }

    #[test]
    fn test_increment_from_absent() {
        let next = ComputeFn::Increment(5).apply(None).unwrap().unwrap();
        assert_eq!(next.as_ref(), b"5");
    }

    #[test]
    fn test_increment_parses_ascii_decimal() {
        let current = Bytes::from_static(b"37");
        let next = ComputeFn::Increment(-7)
            .apply(Some(&current))
            .unwrap()
            .unwrap();
        assert_eq!(next.as_ref(), b"30");
    }

    #[test]
    fn test_increment_rejects_non_numeric() {
        let current = Bytes::from_static(b"not-a-number");
        assert_matches!(
            ComputeFn::Increment(1).apply(Some(&current)),
            Err(Error::Internal(_))
        );
    }

    #[test]
    fn test_append_and_set_if_absent() {
        let current = Bytes::from_static(b"ab");
        let appended = ComputeFn::Append(Bytes::from_static(b"cd"))
            .apply(Some(&current))
            .unwrap()
            .unwrap();
        assert_eq!(appended.as_ref(), b"abcd");

        let kept = ComputeFn::SetIfAbsent(Bytes::from_static(b"new"))
            .apply(Some(&current))
            .unwrap()
            .unwrap();
        assert_eq!(kept.as_ref(), b"ab");

        let installed = ComputeFn::SetIfAbsent(Bytes::from_static(b"new"))
            .apply(None)
            .unwrap()
            .unwrap();
        assert_eq!(installed.as_ref(), b"new");
    }
}
