//! Checkpoint data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A snapshot of graph state for one execution thread.
///
/// The `state` payload is an opaque JSON value: the graph engine serializes
/// its typed state before saving and deserializes on load, so savers never
/// need to know the concrete state type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique checkpoint id.
    pub id: String,

    /// Thread this checkpoint belongs to.
    pub thread_id: String,

    /// Creation timestamp.
    pub ts: DateTime<Utc>,

    /// Serialized graph state.
    pub state: serde_json::Value,
}

impl Checkpoint {
    /// Create a checkpoint for `thread_id` with a fresh id and timestamp.
    pub fn new(thread_id: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            ts: Utc::now(),
            state,
        }
    }
}

/// Addressing configuration for checkpoint operations.
///
/// Currently a thread id; kept as a struct so backends can grow additional
/// addressing fields (namespace, checkpoint id) without breaking callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Execution thread identifier (conventionally the session id).
    pub thread_id: String,
}

impl CheckpointConfig {
    /// Create a config addressing `thread_id`.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}
