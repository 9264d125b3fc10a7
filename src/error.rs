//! Error types for the MeshCache invocation core

use std::path::PathBuf;

use thiserror::Error;

use crate::command::CommandKind;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the MeshCache invocation core
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed command or context, rejected before entering the chain
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A rendezvous party failed, was interrupted or cancelled while the
    /// other party waited
    #[error("Coordination broken: {0}")]
    CoordinationBroken(String),

    /// The terminal handler or a downstream interceptor failed
    #[error("Delegate failure for {kind} command: {source}")]
    Delegate {
        kind: CommandKind,
        #[source]
        source: Box<Error>,
    },

    /// Invalid client/cluster configuration detected at build time
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// State file unreadable or unwritable at startup/shutdown
    #[error("Persistent state error for {}: {}", path.display(), reason)]
    PersistentState { path: PathBuf, reason: String },

    /// Component started or stopped out of order, or the pipeline is not
    /// accepting invocations
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Script missing, malformed or failed to execute
    #[error("Script error: {0}")]
    Script(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a downstream failure as a delegate failure for the given command
    /// kind, preserving the original cause.
    pub fn delegate(kind: CommandKind, source: Error) -> Self {
        Error::Delegate {
            kind,
            source: Box::new(source),
        }
    }

    /// The root cause of a (possibly nested) delegate failure.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Delegate { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
