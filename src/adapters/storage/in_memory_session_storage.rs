//! In-Memory Session Storage Adapter
//!
//! Keeps session records in a map. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{SessionId, UserId};
use crate::ports::{SessionRecord, SessionStorage, StorageError};

const UNLIMITED_WRITES: usize = usize::MAX;

/// In-memory storage for session records
#[derive(Debug, Clone)]
pub struct InMemorySessionStorage {
    records: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
    unavailable: Arc<AtomicBool>,
    write_budget: Arc<AtomicUsize>,
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            unavailable: Arc::default(),
            write_budget: Arc::new(AtomicUsize::new(UNLIMITED_WRITES)),
        }
    }
}

impl InMemorySessionStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `writes` puts succeed and fail every put after that.
    /// Reads and deletes are unaffected.
    pub fn fail_writes_after(&self, writes: usize) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    /// Undo `fail_writes_after`.
    pub fn allow_all_writes(&self) {
        self.write_budget.store(UNLIMITED_WRITES, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`
    /// (or succeed again with `false`). Shared across clones.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Get the number of stored records
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn get(&self, key: SessionId) -> Result<Option<SessionRecord>, StorageError> {
        self.check_available()?;
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn put(&self, record: SessionRecord) -> Result<(), StorageError> {
        self.check_available()?;
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED_WRITES => Some(left),
                0 => None,
                n => Some(n - 1),
            })
            .map_err(|_| StorageError::Unavailable("in-memory write budget used up".to_string()))?;
        self.records.write().await.insert(record.session_id, record);
        Ok(())
    }

    async fn delete(&self, key: SessionId) -> Result<bool, StorageError> {
        self.check_available()?;
        Ok(self.records.write().await.remove(&key).is_some())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<SessionRecord>, StorageError> {
        self.check_available()?;
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| &r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        self.check_available()?;
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionStatus, Timestamp};
    use serde_json::json;

    fn record(owner: &str) -> SessionRecord {
        SessionRecord {
            session_id: SessionId::new(),
            owner_id: UserId::new(owner).unwrap(),
            status: SessionStatus::Active,
            last_activity_at: Timestamp::now(),
            payload: json!({"owner": owner}),
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_record() {
        let storage = InMemorySessionStorage::new();
        let rec = record("u1");
        storage.put(rec.clone()).await.unwrap();

        assert_eq!(storage.get(rec.session_id).await.unwrap(), Some(rec));
        assert_eq!(storage.record_count().await, 1);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let storage = InMemorySessionStorage::new();
        assert_eq!(storage.get(SessionId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let storage = InMemorySessionStorage::new();
        let mut rec = record("u1");
        storage.put(rec.clone()).await.unwrap();
        rec.status = SessionStatus::Paused;
        storage.put(rec.clone()).await.unwrap();

        let loaded = storage.get(rec.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Paused);
        assert_eq!(storage.record_count().await, 1);
    }

    #[tokio::test]
    async fn list_by_owner_filters() {
        let storage = InMemorySessionStorage::new();
        storage.put(record("u1")).await.unwrap();
        storage.put(record("u1")).await.unwrap();
        storage.put(record("u2")).await.unwrap();

        let owner = UserId::new("u1").unwrap();
        assert_eq!(storage.list_by_owner(&owner).await.unwrap().len(), 2);
        assert_eq!(storage.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let storage = InMemorySessionStorage::new();
        let rec = record("u1");
        storage.put(rec.clone()).await.unwrap();

        assert!(storage.delete(rec.session_id).await.unwrap());
        assert!(!storage.delete(rec.session_id).await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let storage = InMemorySessionStorage::new();
        let clone = storage.clone();
        storage.set_unavailable(true);

        assert!(matches!(
            clone.put(record("u1")).await,
            Err(StorageError::Unavailable(_))
        ));
        storage.set_unavailable(false);
        assert!(clone.put(record("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn write_budget_fails_puts_but_not_deletes() {
        let storage = InMemorySessionStorage::new();
        let kept = record("u1");
        storage.fail_writes_after(1);

        assert!(storage.put(kept.clone()).await.is_ok());
        assert!(matches!(
            storage.put(record("u1")).await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.delete(kept.session_id).await.unwrap());

        storage.allow_all_writes();
        assert!(storage.put(record("u1")).await.is_ok());
    }
}
