//! The [`CheckpointSaver`] storage abstraction.
//!
//! Implementations must be `Send + Sync`; compiled graphs hold them behind an
//! `Arc<dyn CheckpointSaver>` and may call them from concurrent executions on
//! different threads.

use crate::checkpoint::{Checkpoint, CheckpointConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Storage backend for graph checkpoints.
///
/// Savers append checkpoints per thread and serve the latest one back.
/// History retention is backend policy; the engine only ever asks for the
/// most recent snapshot of a thread.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Persist a checkpoint.
    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Fetch the most recent checkpoint for the configured thread, if any.
    async fn get_latest(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>>;

    /// List all checkpoints for the configured thread, oldest first.
    async fn list(&self, config: &CheckpointConfig) -> Result<Vec<Checkpoint>>;

    /// Remove every checkpoint belonging to the configured thread.
    async fn delete_thread(&self, config: &CheckpointConfig) -> Result<()>;
}
