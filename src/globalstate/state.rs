//! Scoped State Records and Providers

use std::collections::BTreeMap;

use crate::error::Result;

/// Scope identifier for engine-wide state
pub const GLOBAL_SCOPE: &str = "___global";

/// A named set of key/value records persisted across restarts for one
/// subsystem scope.
///
/// Records are kept sorted so persisted files are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedState {
    scope: String,
    properties: BTreeMap<String, String>,
}

impl ScopedState {
    /// Create an empty state for the given scope
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            properties: BTreeMap::new(),
        }
    }

    /// The scope this state belongs to
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Set one record
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Read one record
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when no records are present
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate records in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A component contributing records to the persisted global state.
///
/// Registered with the [`super::GlobalStateManager`], which drives the
/// restore callback at startup (when prior state exists) and the persist
/// callback at shutdown.
pub trait GlobalStateProvider: Send + Sync {
    /// Inspect previously persisted state before the engine accepts traffic
    fn prepare_for_restore(&self, state: &ScopedState) -> Result<()>;

    /// Contribute records to the state about to be persisted
    fn prepare_for_persist(&self, state: &mut ScopedState);
}
