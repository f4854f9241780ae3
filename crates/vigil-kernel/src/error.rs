//! Error taxonomy for the engine and its collaborators.

use std::time::Duration;

/// Errors that abort a life-cycle step. Only policy violations are fatal.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The offline execution policy was breached. Never recovered from.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Snapshot persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u64, expected: u32 },

    #[error("primary and backup snapshots are unreadable (primary: {primary}; backup: {backup})")]
    Unreadable { primary: String, backup: String },

    #[error("snapshot capability is not permitted")]
    NotPermitted,
}

/// Text-generation backend failures. Recovered by the router, surfaced only as metadata.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend transport error: {0}")]
    Transport(String),

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("unknown model key: {0}")]
    UnknownModel(String),
}

/// Rejected command-surface input. Rendered as response text, never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Command not recognized.")]
    NotRecognized,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown backend key: {0}")]
    UnknownModel(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
