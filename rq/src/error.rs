//! Error types for configuration and coordinated execution

use thiserror::Error;

use crate::domain::RejectionReason;

/// Errors raised while building a coordination policy
///
/// These surface at configuration time only. A policy that builds
/// successfully never produces a configuration error at call time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Mode \"{0}\" is not valid (expected prevent, abort or force)")]
    InvalidMode(String),

    #[error("Verb \"{0}\" is not a supported HTTP method")]
    InvalidVerb(String),
}

/// Outcome errors of [`Coordinator::execute`](crate::Coordinator::execute)
///
/// `E` is the error type of the wrapped transport operation.
#[derive(Debug, Error)]
pub enum SyncError<E> {
    /// The call was declined by its coordination mode
    #[error("Request rejected by coordination policy ({reason})")]
    Rejected { reason: RejectionReason },

    /// The call was cancelled by its timeout or by the caller's own token
    #[error("Request cancelled")]
    Cancelled,

    /// The wrapped operation itself failed
    #[error("Transport error: {0}")]
    Transport(E),
}

impl<E> SyncError<E> {
    /// Check if this is a policy rejection rather than a real failure
    pub fn is_rejection(&self) -> bool {
        matches!(self, SyncError::Rejected { .. })
    }

    /// Get the rejection reason, if this is a policy rejection
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            SyncError::Rejected { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Get the transport error, if the wrapped operation failed
    pub fn into_transport(self) -> Option<E> {
        match self {
            SyncError::Transport(e) => Some(e),
            _ => None,
        }
    }
}
