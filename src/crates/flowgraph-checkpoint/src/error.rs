//! Error types for checkpoint operations.

use thiserror::Error;

/// Errors produced by checkpoint savers.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The requested thread has no checkpoints.
    #[error("No checkpoint found for thread '{0}'")]
    NotFound(String),

    /// State could not be serialized or deserialized.
    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific storage failure.
    #[error("Checkpoint storage error: {0}")]
    Storage(String),
}

/// Convenience result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;
