//! Repository layer for domain records.
//!
//! Tools persist through the [`RecordStore`] trait; the SQL backend is an
//! external collaborator, so this crate ships the trait plus in-memory
//! implementations used for development and tests. Tool-side calls go
//! through [`with_retries`], which absorbs transient backend failures with
//! exponential backoff before the tool turns the final error into a string
//! for the LLM.

pub mod memory;
pub mod records;

pub use memory::{MemoryRecordStore, MemoryUserStore};
pub use records::{
    BloodPressureRecord, HealthEventRecord, HealthRecord, MedicationRecord, RecoveryStatus,
    SymptomRecord, UserRecord,
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Backend failure inside a store.
#[derive(Error, Debug, Clone)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// CRUD surface the domain tools persist through.
#[async_trait]
pub trait RecordStore<R: HealthRecord>: Send + Sync {
    /// Insert a record.
    async fn create(&self, record: R) -> StoreResult<R>;

    /// Records of `user_id` whose event time falls in `[start, end]`,
    /// ascending by event time.
    async fn get_recent(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<R>>;

    /// The user's most recent record by event time, ties broken by latest
    /// creation time.
    async fn latest(&self, user_id: &str) -> StoreResult<Option<R>>;

    /// Apply `patch` to the record with `id`; returns the updated record, or
    /// `None` when no such record exists.
    async fn update(
        &self,
        id: Uuid,
        patch: Box<dyn for<'a> FnOnce(&'a mut R) + Send + 'static>,
    ) -> StoreResult<Option<R>>;
}

/// Persistent user profiles backing token creation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by id.
    async fn get_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;
}

/// The set of stores the tool layer is wired with.
#[derive(Clone)]
pub struct Repositories {
    pub blood_pressure: Arc<dyn RecordStore<BloodPressureRecord>>,
    pub medication: Arc<dyn RecordStore<MedicationRecord>>,
    pub symptom: Arc<dyn RecordStore<SymptomRecord>>,
    pub health_event: Arc<dyn RecordStore<HealthEventRecord>>,
    pub users: Arc<dyn UserStore>,
}

impl Repositories {
    /// All-in-memory repositories.
    pub fn in_memory() -> Self {
        Self {
            blood_pressure: Arc::new(MemoryRecordStore::new()),
            medication: Arc::new(MemoryRecordStore::new()),
            symptom: Arc::new(MemoryRecordStore::new()),
            health_event: Arc::new(MemoryRecordStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

/// Run `operation` with up to 3 attempts and exponential backoff.
///
/// Only the final failure is surfaced; intermediate failures are logged.
pub async fn with_retries<T, F, Fut>(operation_name: &str, mut operation: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    let mut delay = Duration::from_millis(100);

    for attempt in 1..=MAX_ATTEMPTS {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    "Store operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                tracing::error!(operation = operation_name, error = %e, "Store operation failed");
                return Err(e);
            }
        }
    }
    unreachable!("retry loop always returns")
}
