//! Cache Key and Outcome Types

use std::fmt;

use bytes::Bytes;

/// Key identifying one cache entry.
///
/// Keys are arbitrary byte strings. The empty key is reserved as invalid and
/// is rejected by command validation before a command enters the pipeline.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Bytes);

impl CacheKey {
    /// Create a new cache key from any byte-like source
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the (invalid) empty key
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Result of one command invocation, produced by the terminal handler (or by
/// whichever interceptor short-circuited) and propagated back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The operation completed with no value to report (e.g. `Clear`)
    Done,
    /// A value-bearing result: hit/miss for reads, previous value for writes
    Value(Option<Bytes>),
    /// A conditional operation reporting whether it took effect
    Applied(bool),
}

impl CommandOutcome {
    /// The carried value, if this outcome is value-bearing
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            CommandOutcome::Value(v) => v.as_ref(),
            _ => None,
        }
    }

    /// Whether a conditional operation took effect.
    ///
    /// Non-conditional outcomes report `true`.
    pub fn applied(&self) -> bool {
        match self {
            CommandOutcome::Applied(applied) => *applied,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip() {
        let key = CacheKey::from("user:42");
        assert_eq!(key.as_bytes(), b"user:42");
        assert_eq!(key.len(), 7);
        assert!(!key.is_empty());
    }

    #[test]
    fn test_empty_key_detected() {
        assert!(CacheKey::new(Bytes::new()).is_empty());
    }

    #[test]
    fn test_outcome_value_accessor() {
        let hit = CommandOutcome::Value(Some(Bytes::from_static(b"v")));
        assert_eq!(hit.value().unwrap().as_ref(), b"v");
        assert!(CommandOutcome::Done.value().is_none());
        assert!(!CommandOutcome::Applied(false).applied());
    }
}
