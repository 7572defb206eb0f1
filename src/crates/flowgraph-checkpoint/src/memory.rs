//! In-memory checkpoint storage.
//!
//! Stores per-thread checkpoint vectors in a `HashMap` behind a
//! `parking_lot::RwLock`. All operations are synchronous under the hood; the
//! async trait methods never block across an await point while holding the
//! lock.
//!
//! Data does not survive process restart. Use a persistent
//! [`CheckpointSaver`] implementation for deployments that need recovery.

use crate::checkpoint::{Checkpoint, CheckpointConfig};
use crate::error::Result;
use crate::traits::CheckpointSaver;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Thread-safe in-memory implementation of [`CheckpointSaver`].
#[derive(Default)]
pub struct InMemoryCheckpointSaver {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointSaver {
    /// Create an empty saver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with at least one checkpoint.
    pub fn thread_count(&self) -> usize {
        self.threads.read().len()
    }

    /// Drop all stored checkpoints. Intended for test isolation.
    pub fn clear(&self) {
        self.threads.write().clear();
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut threads = self.threads.write();
        threads
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn get_latest(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read();
        Ok(threads
            .get(&config.thread_id)
            .and_then(|entries| entries.last().cloned()))
    }

    async fn list(&self, config: &CheckpointConfig) -> Result<Vec<Checkpoint>> {
        let threads = self.threads.read();
        Ok(threads.get(&config.thread_id).cloned().unwrap_or_default())
    }

    async fn delete_thread(&self, config: &CheckpointConfig) -> Result<()> {
        self.threads.write().remove(&config.thread_id);
        Ok(())
    }
}
