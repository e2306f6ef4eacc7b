//! Session Storage Port - Interface for the durable keyed store.
//!
//! Records are keyed by session id with a secondary lookup by owner. The
//! payload is the serialized session; the store never interprets it beyond
//! the index fields copied alongside.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, SessionStatus, Timestamp, UserId};

/// Errors that can occur during storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Record for session {key} is unreadable: {reason}")]
    Corrupt { key: SessionId, reason: String },

    #[error("Failed to serialize record: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable form of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub owner_id: UserId,
    pub status: SessionStatus,
    pub last_activity_at: Timestamp,
    pub payload: serde_json::Value,
}

/// Port for persisting session records
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Fetch a record
    ///
    /// # Returns
    /// `None` if no record exists for `key`
    ///
    /// # Errors
    /// Returns `StorageError::Corrupt` if a record exists but cannot be read
    async fn get(&self, key: SessionId) -> Result<Option<SessionRecord>, StorageError>;

    /// Insert or overwrite a record. Last writer wins.
    async fn put(&self, record: SessionRecord) -> Result<(), StorageError>;

    /// Delete a record
    ///
    /// # Returns
    /// `true` if a record was removed
    async fn delete(&self, key: SessionId) -> Result<bool, StorageError>;

    /// All records owned by `owner`, in no particular order
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<SessionRecord>, StorageError>;

    /// Every record, for retention sweeps
    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_error_names_the_key() {
        let key = SessionId::new();
        let err = StorageError::Corrupt {
            key,
            reason: "bad yaml".to_string(),
        };
        assert!(err.to_string().contains(&key.to_string()));
        assert!(err.to_string().contains("bad yaml"));
    }

    #[test]
    fn record_serializes_payload_inline() {
        let record = SessionRecord {
            session_id: SessionId::new(),
            owner_id: UserId::new("u1").unwrap(),
            status: SessionStatus::Paused,
            last_activity_at: Timestamp::now(),
            payload: serde_json::json!({"current_state": "welcome"}),
        };
        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(yaml.contains("status: paused"));
        assert!(yaml.contains("current_state: welcome"));
    }
}
