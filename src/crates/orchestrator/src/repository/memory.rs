//! In-memory store implementations.

use crate::repository::records::{HealthRecord, UserRecord};
use crate::repository::{RecordStore, StoreResult, UserStore};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Generic in-memory [`RecordStore`].
pub struct MemoryRecordStore<R> {
    records: RwLock<Vec<R>>,
}

impl<R> MemoryRecordStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<R> Default for MemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: HealthRecord> RecordStore<R> for MemoryRecordStore<R> {
    async fn create(&self, record: R) -> StoreResult<R> {
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn get_recent(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<R>> {
        let mut matching: Vec<R> = self
            .records
            .read()
            .iter()
            .filter(|r| {
                r.user_id() == user_id && r.occurred_at() >= start && r.occurred_at() <= end
            })
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.occurred_at(), r.created_at()));
        Ok(matching)
    }

    async fn latest(&self, user_id: &str) -> StoreResult<Option<R>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.user_id() == user_id)
            .max_by_key(|r| (r.occurred_at(), r.created_at()))
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: Box<dyn for<'a> FnOnce(&'a mut R) + Send + 'static>,
    ) -> StoreResult<Option<R>> {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                patch(record);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }
}

/// In-memory [`UserStore`].
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub fn insert(&self, user: UserRecord) {
        self.users.write().insert(user.user_id.clone(), user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.read().get(user_id).cloned())
    }
}
