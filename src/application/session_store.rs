//! SessionStore - Maps sessions to storage records and back.
//!
//! Every storage problem surfaces as a typed `ConversationError`. A record
//! that exists but cannot be read is logged and reported as not found; it is
//! never replaced by a default session.

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::conversation::{ConversationError, ConversationSession, SessionLimits};
use crate::domain::foundation::{SessionId, UserId};
use crate::ports::{SessionRecord, SessionStorage, StorageError};

/// Typed access to the session storage port.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, limits: SessionLimits) -> Self {
        Self { storage, limits }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Loads a session and applies the configured size bounds.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if absent or unreadable
    /// - `StorageFailure` if the store cannot be reached
    pub async fn load(&self, id: SessionId) -> Result<ConversationSession, ConversationError> {
        let record = match self.storage.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(ConversationError::SessionNotFound(id)),
            Err(StorageError::Corrupt { reason, .. }) => {
                warn!(session_id = %id, reason = %reason, "Session record is corrupt");
                return Err(ConversationError::SessionNotFound(id));
            }
            Err(e) => return Err(storage_failure(id, e)),
        };
        self.decode(record)
    }

    /// Decodes a listed record.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the payload is not a valid session
    pub fn decode(&self, record: SessionRecord) -> Result<ConversationSession, ConversationError> {
        let id = record.session_id;
        let mut session: ConversationSession = serde_json::from_value(record.payload)
            .map_err(|e| {
                warn!(session_id = %id, error = %e, "Session payload is unreadable");
                ConversationError::SessionNotFound(id)
            })?;
        if session.id() != id {
            warn!(session_id = %id, payload_id = %session.id(), "Session record key does not match payload");
            return Err(ConversationError::SessionNotFound(id));
        }
        session.apply_limits(self.limits);
        Ok(session)
    }

    /// Writes the full session. Last writer wins.
    pub async fn save(&self, session: &ConversationSession) -> Result<(), ConversationError> {
        let id = session.id();
        let payload = serde_json::to_value(session).map_err(|e| {
            ConversationError::storage(format!("cannot serialize session {}: {}", id, e))
        })?;
        let record = SessionRecord {
            session_id: id,
            owner_id: session.owner_id().clone(),
            status: session.status(),
            last_activity_at: session.last_activity_at(),
            payload,
        };
        self.storage
            .put(record)
            .await
            .map_err(|e| storage_failure(id, e))?;
        debug!(session_id = %id, state = %session.current_state(), "Session saved");
        Ok(())
    }

    /// Returns true if a record was removed.
    pub async fn delete(&self, id: SessionId) -> Result<bool, ConversationError> {
        self.storage
            .delete(id)
            .await
            .map_err(|e| storage_failure(id, e))
    }

    pub async fn records_for(&self, owner: &UserId) -> Result<Vec<SessionRecord>, ConversationError> {
        self.storage.list_by_owner(owner).await.map_err(|e| {
            error!(owner_id = %owner, error = %e, "Listing sessions failed");
            ConversationError::storage(e.to_string())
        })
    }

    pub async fn all_records(&self) -> Result<Vec<SessionRecord>, ConversationError> {
        self.storage.list_all().await.map_err(|e| {
            error!(error = %e, "Listing sessions failed");
            ConversationError::storage(e.to_string())
        })
    }
}

fn storage_failure(id: SessionId, err: StorageError) -> ConversationError {
    error!(session_id = %id, error = %err, "Session storage failed");
    ConversationError::storage(err.to_string())
}
