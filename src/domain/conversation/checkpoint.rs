//! Named, user-initiated save points.

use serde::{Deserialize, Serialize};

use super::{ConversationState, Message, SessionContext};
use crate::domain::flow::FlowKind;
use crate::domain::foundation::{SessionStatus, Timestamp};

/// What a checkpoint captures. Progress and confidence are derived, so they
/// are recomputed on restore instead of stored. The state history and the
/// refinement counts belong to the session as a whole and are never rolled
/// back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_state: ConversationState,
    pub status: SessionStatus,
    #[serde(default)]
    pub resume_state: Option<ConversationState>,
    pub messages: Vec<Message>,
    pub context: SessionContext,
    pub flow: FlowKind,
    pub last_error: Option<String>,
    pub pause_reason: Option<String>,
}

/// A labelled snapshot, independent of the automatic state history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub label: String,
    pub created_at: Timestamp,
    pub snapshot: SessionSnapshot,
}

/// Listing entry for a checkpoint, without the snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub label: String,
    pub created_at: Timestamp,
    pub state: ConversationState,
    pub message_count: usize,
}

impl From<&Checkpoint> for CheckpointSummary {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            label: checkpoint.label.clone(),
            created_at: checkpoint.created_at,
            state: checkpoint.snapshot.current_state,
            message_count: checkpoint.snapshot.messages.len(),
        }
    }
}
