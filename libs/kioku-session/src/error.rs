//! Error types for sessions and sync.

use std::time::Duration;
use thiserror::Error;

/// Failures at the sync-layer boundary.
///
/// All remote I/O errors are translated into one of these before they reach
/// the session; they never propagate past the state machine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("endpoint rejected write: {status} {message}")]
    Rejected { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("pending cache error: {0}")]
    Cache(String),
}

/// Errors surfaced by the session state machine and manager.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invariant violation at session start; the session never activates.
    #[error("cannot start session: missing {0}")]
    MissingInput(&'static str),

    #[error("{action} is not allowed while the session is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error(transparent)]
    Sync(#[from] SyncError),
}
