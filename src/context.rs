//! Invocation Context
//!
//! Per-invocation state threaded through the interceptor chain: where the
//! command originated, which lock owner / transaction it correlates with,
//! invocation-level flags, and an ad hoc attribute map for cross-interceptor
//! communication. A context is created fresh per top-level invocation and
//! never reused across unrelated invocations.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::command::FlagSet;

/// Identity of a cluster member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh node identity
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a command was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Issued by the local node's API layer
    Local,
    /// Delivered by the remote-command deliverer on behalf of a cluster member
    Remote(NodeId),
}

impl Origin {
    /// True for locally-issued commands
    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self, Origin::Local)
    }
}

/// Opaque identifier correlating an invocation to a held lock.
///
/// The context borrows the correlation only; lock lifecycle is owned by the
/// locking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockOwner(Uuid);

impl LockOwner {
    /// Generate a fresh lock-owner identity
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Opaque identifier correlating an invocation to an enlisted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle(Uuid);

impl TransactionHandle {
    /// Generate a fresh transaction handle
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Per-invocation state carried alongside the command through the chain
#[derive(Debug)]
pub struct InvocationContext {
    origin: Origin,
    lock_owner: Option<LockOwner>,
    transaction: Option<TransactionHandle>,
    flags: FlagSet,
    attributes: HashMap<String, serde_json::Value>,
}

impl InvocationContext {
    /// Context for a locally-issued invocation
    pub fn local() -> Self {
        Self::new(Origin::Local)
    }

    /// Context for a command delivered from a remote cluster member
    pub fn remote(node: NodeId) -> Self {
        Self::new(Origin::Remote(node))
    }

    fn new(origin: Origin) -> Self {
        Self {
            origin,
            lock_owner: None,
            transaction: None,
            flags: FlagSet::EMPTY,
            attributes: HashMap::new(),
        }
    }

    /// Builder-style flag assignment
    #[must_use]
    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// Builder-style lock-owner correlation
    #[must_use]
    pub fn with_lock_owner(mut self, owner: LockOwner) -> Self {
        self.lock_owner = Some(owner);
        self
    }

    /// Builder-style transaction correlation
    #[must_use]
    pub fn with_transaction(mut self, tx: TransactionHandle) -> Self {
        self.transaction = Some(tx);
        self
    }

    /// Where this invocation originated
    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// True for locally-issued invocations
    #[inline]
    pub fn is_origin_local(&self) -> bool {
        self.origin.is_local()
    }

    /// The correlated lock owner, if any
    pub fn lock_owner(&self) -> Option<LockOwner> {
        self.lock_owner
    }

    /// The correlated transaction, if any
    pub fn transaction(&self) -> Option<TransactionHandle> {
        self.transaction
    }

    /// Invocation-level flags
    pub fn flags(&self) -> FlagSet {
        self.flags
    }

    /// Store an ad hoc attribute for a later interceptor in this invocation
    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Read an attribute stored earlier in this invocation
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Derive a context for a sub-invocation triggered by distribution.
    ///
    /// Copies origin and transaction correlation; attributes and lock-owner
    /// correlation start empty.
    pub fn derive(&self) -> Self {
        Self {
            origin: self.origin,
            lock_owner: None,
            transaction: self.transaction,
            flags: self.flags,
            attributes: HashMap::new(),
        }
    }
}
