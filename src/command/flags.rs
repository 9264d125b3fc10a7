//! Execution Modifier Flags
//!
//! Flags tune how a single invocation traverses the pipeline. They are
//! carried on both the command and the invocation context; interceptors
//! consult the union of the two sets.

use std::fmt;

/// Execution modifier for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Flag {
    /// Skip loading the entry from any backing store
    SkipCacheLoad = 1 << 0,
    /// Skip lock acquisition for this invocation
    SkipLocking = 1 << 1,
    /// Acquire the write lock eagerly even for reads
    ForceWriteLock = 1 << 2,
    /// Do not return the previous value for write operations
    IgnoreReturnValue = 1 << 3,
    /// Exclude this invocation from statistics
    SkipStatistics = 1 << 4,
    /// Fail immediately instead of waiting for locks
    ZeroLockAcquisition = 1 << 5,
}

impl Flag {
    /// All defined flags, in bit order
    pub const ALL: [Flag; 6] = [
        Flag::SkipCacheLoad,
        Flag::SkipLocking,
        Flag::ForceWriteLock,
        Flag::IgnoreReturnValue,
        Flag::SkipStatistics,
        Flag::ZeroLockAcquisition,
    ];

    fn name(&self) -> &'static str {
        match self {
            Flag::SkipCacheLoad => "SKIP_CACHE_LOAD",
            Flag::SkipLocking => "SKIP_LOCKING",
            Flag::ForceWriteLock => "FORCE_WRITE_LOCK",
            Flag::IgnoreReturnValue => "IGNORE_RETURN_VALUE",
            Flag::SkipStatistics => "SKIP_STATISTICS",
            Flag::ZeroLockAcquisition => "ZERO_LOCK_ACQUISITION",
        }
    }
}

/// Compact set of [`Flag`]s
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagSet(u32);

impl FlagSet {
    /// The empty flag set
    pub const EMPTY: FlagSet = FlagSet(0);

    /// Create an empty flag set
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// True if no flags are set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Test for a single flag
    #[inline]
    pub fn contains(&self, flag: Flag) -> bool {
        self.0 & flag as u32 != 0
    }

    /// Add a flag in place
    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag as u32;
    }

    /// Remove a flag in place
    pub fn remove(&mut self, flag: Flag) {
        self.0 &= !(flag as u32);
    }

    /// Builder-style addition
    #[must_use]
    pub fn with(mut self, flag: Flag) -> Self {
        self.insert(flag);
        self
    }

    /// Union of two flag sets
    #[must_use]
    pub fn union(&self, other: FlagSet) -> FlagSet {
        FlagSet(self.0 | other.0)
    }
}

impl From<Flag> for FlagSet {
    fn from(flag: Flag) -> Self {
        FlagSet(flag as u32)
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut set = FlagSet::EMPTY;
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for flag in Flag::ALL {
            if self.contains(flag) {
                set.entry(&flag.name());
            }
        }
        set.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut flags = FlagSet::new();
        assert!(flags.is_empty());
        flags.insert(Flag::SkipLocking);
        flags.insert(Flag::IgnoreReturnValue);
        assert!(flags.contains(Flag::SkipLocking));
        assert!(flags.contains(Flag::IgnoreReturnValue));
        assert!(!flags.contains(Flag::ForceWriteLock));
        flags.remove(Flag::SkipLocking);
        assert!(!flags.contains(Flag::SkipLocking));
    }

    #[test]
    fn test_union() {
        let a = FlagSet::from(Flag::SkipCacheLoad);
        let b = FlagSet::from(Flag::SkipStatistics);
        let both = a.union(b);
        assert!(both.contains(Flag::SkipCacheLoad));
        assert!(both.contains(Flag::SkipStatistics));
    }

    #[test]
    fn test_from_iterator() {
        let flags: FlagSet = [Flag::SkipLocking, Flag::ZeroLockAcquisition]
            .into_iter()
            .collect();
        assert!(flags.contains(Flag::SkipLocking));
        assert!(flags.contains(Flag::ZeroLockAcquisition));
        assert!(!flags.contains(Flag::SkipCacheLoad));
    }
}
