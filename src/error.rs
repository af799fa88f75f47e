use thiserror::Error;

use crate::model::MediaKind;

/// Errors surfaced by the sync components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The command interface is unreachable (not yet connected, or the
    /// connection was torn down).
    #[error("no server client available")]
    NoClient,

    /// A command call failed or timed out at the transport level.
    #[error("network failure: {0}")]
    Network(String),

    /// A server payload was missing required fields. The local collection
    /// is left untouched when this occurs.
    #[error("failed to parse server payload: {0}")]
    Parse(String),

    /// The target of a mutation does not exist locally.
    #[error("{kind} {id} not found")]
    NotFound { kind: MediaKind, id: String },

    /// The server accepted the call target but reported failure.
    #[error("{operation} failed: {reason}")]
    CommandFailed { operation: String, reason: String },
}

impl SyncError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network(detail.into())
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self::Parse(detail.into())
    }

    pub fn not_found(kind: MediaKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn command_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
