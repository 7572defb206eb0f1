//! Error types for graph construction and execution.

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors produced while building, validating, or executing a graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure validation failed (missing nodes, bad edges, ...).
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A node's executor returned an error.
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed.
        node: String,
        /// Error message from the executor.
        error: String,
    },

    /// Execution-level failure not tied to a single node.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Checkpoint persistence failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] flowgraph_checkpoint::CheckpointError),

    /// State could not be serialized for checkpointing.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation exceeded its time budget.
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        /// Description of what timed out.
        operation: String,
        /// Budget in milliseconds.
        duration_ms: u64,
    },
}

impl GraphError {
    /// Create a [`GraphError::NodeExecution`] with context.
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }
}
