//! Message entity for conversations.
//!
//! Messages are immutable records of user/assistant exchanges within a
//! session. System messages that mark state transitions are pinned and
//! survive trimming.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{ConversationState, Trigger};
use crate::domain::foundation::{MessageId, Timestamp, ValidationError};

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions and transition markers.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

impl Role {
    /// Returns true if this is a user-visible role.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

/// Metadata attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Conversation state when the message was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ConversationState>,

    /// Pinned messages are never trimmed.
    #[serde(default)]
    pub pinned: bool,

    /// Trigger that accompanied the message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,

    /// Free-form caller data (analytics, UI hints).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl MessageMetadata {
    /// Metadata tagged with the state the conversation was in.
    pub fn in_state(state: ConversationState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Marks the message as pinned.
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// Records the trigger that accompanied the message.
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Adds a free-form entry.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// An immutable message within a session.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `content` is non-empty (validated at construction)
/// - `timestamp` is set at construction and never changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    timestamp: Timestamp,
    #[serde(default)]
    metadata: MessageMetadata,
}

impl Message {
    /// Creates a new message with the given role and content.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if content is blank
    pub fn new(
        role: Role,
        content: impl Into<String>,
        metadata: MessageMetadata,
    ) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::empty_field("content"));
        }

        Ok(Self {
            id: MessageId::new(),
            role,
            content,
            timestamp: Timestamp::now(),
            metadata,
        })
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }

    /// Returns true if trimming must skip this message.
    pub fn is_pinned(&self) -> bool {
        self.metadata.pinned
    }

    /// Returns true if this message came from the user.
    pub fn is_from_user(&self) -> bool {
        self.role == Role::User
    }

    /// Drops caller-supplied metadata, keeping state, trigger and pin flag.
    pub(crate) fn strip_extra_metadata(&mut self) {
        self.metadata.extra.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_rejected() {
        let err = Message::new(Role::User, "   ", MessageMetadata::default()).unwrap_err();
        assert_eq!(err, ValidationError::empty_field("content"));
    }

    #[test]
    fn pinned_flag_comes_from_metadata() {
        let marker = Message::new(
            Role::System,
            "Entered welcome",
            MessageMetadata::in_state(ConversationState::Welcome).pinned(),
        )
        .unwrap();
        assert!(marker.is_pinned());
        assert!(!marker.role().is_user_visible());
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let message = Message::new(
            Role::User,
            "hello",
            MessageMetadata::in_state(ConversationState::Initial)
                .with_trigger(Trigger::DescribeCourse)
                .with_extra("source", serde_json::json!("chat")),
        )
        .unwrap();

        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn stripping_metadata_keeps_pin() {
        let mut message = Message::new(
            Role::System,
            "marker",
            MessageMetadata::default()
                .pinned()
                .with_extra("debug", serde_json::json!(true)),
        )
        .unwrap();
        message.strip_extra_metadata();
        assert!(message.metadata().extra.is_empty());
        assert!(message.is_pinned());
    }
}
