//! Conversation-specific error types.

use thiserror::Error;

use super::{ConversationState, Trigger};
use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionStatus, ValidationError,
};

/// Errors returned by session, state-machine and manager operations.
///
/// Every failure is surfaced as a typed value; nothing is absorbed into a
/// default state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversationError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("trigger {trigger} is not valid in state {state}")]
    InvalidTransition {
        state: ConversationState,
        trigger: Trigger,
        valid_triggers: Vec<Trigger>,
    },

    #[error("cannot change session status from {from} to {to}")]
    InvalidStatusTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("cannot enter {target}: missing context {missing:?}")]
    MissingContext {
        target: ConversationState,
        missing: Vec<String>,
    },

    #[error("{state} has been entered {limit} times, the refinement limit")]
    RefinementLimitReached {
        state: ConversationState,
        limit: u32,
    },

    #[error("invalid backtrack target: {}", .0.map(|s| s.to_string()).unwrap_or_else(|| "none available".to_string()))]
    InvalidBacktrackTarget(Option<ConversationState>),

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("generation failed in {state}: {reason}")]
    GenerationFailure {
        state: ConversationState,
        reason: String,
    },

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("invalid import format: {0}")]
    InvalidImportFormat(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl ConversationError {
    pub fn storage(message: impl Into<String>) -> Self {
        ConversationError::StorageFailure(message.into())
    }

    pub fn import(message: impl Into<String>) -> Self {
        ConversationError::InvalidImportFormat(message.into())
    }

    pub fn generation(state: ConversationState, reason: impl Into<String>) -> Self {
        ConversationError::GenerationFailure {
            state,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConversationError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            ConversationError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            ConversationError::InvalidStatusTransition { .. } => {
                ErrorCode::InvalidStateTransition
            }
            ConversationError::MissingContext { .. } => ErrorCode::MissingContext,
            ConversationError::RefinementLimitReached { .. } => {
                ErrorCode::RefinementLimitReached
            }
            ConversationError::InvalidBacktrackTarget(_) => ErrorCode::InvalidBacktrackTarget,
            ConversationError::CheckpointNotFound(_) => ErrorCode::CheckpointNotFound,
            ConversationError::GenerationFailure { .. } => ErrorCode::GenerationFailed,
            ConversationError::StorageFailure(_) => ErrorCode::StorageFailed,
            ConversationError::InvalidImportFormat(_) => ErrorCode::InvalidImportFormat,
            ConversationError::Unsupported(_) => ErrorCode::Unsupported,
            ConversationError::Validation(_) => ErrorCode::ValidationFailed,
        }
    }

    /// Returns true if the session itself is still usable after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ConversationError::StorageFailure(_))
    }
}

impl From<ConversationError> for DomainError {
    fn from(err: ConversationError) -> Self {
        let mut domain = DomainError::new(err.code(), err.to_string());
        match &err {
            ConversationError::InvalidTransition { valid_triggers, .. } => {
                let list: Vec<String> = valid_triggers.iter().map(|t| t.to_string()).collect();
                domain = domain.with_detail("valid_triggers", list.join(","));
            }
            ConversationError::MissingContext { missing, .. } => {
                domain = domain.with_detail("missing", missing.join(","));
            }
            _ => {}
        }
        domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_misuse_shares_the_transition_code() {
        let err = ConversationError::InvalidStatusTransition {
            from: SessionStatus::Completed,
            to: SessionStatus::Active,
        };
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert_eq!(
            err.to_string(),
            "cannot change session status from completed to active"
        );
    }

    #[test]
    fn missing_context_lists_keys_in_domain_details() {
        let err = ConversationError::MissingContext {
            target: ConversationState::StructureGeneration,
            missing: vec!["requirements".to_string()],
        };
        let domain: DomainError = err.into();
        assert_eq!(domain.code, ErrorCode::MissingContext);
        assert_eq!(
            domain.details.get("missing").map(String::as_str),
            Some("requirements")
        );
    }

    #[test]
    fn backtrack_target_message_handles_none() {
        let err = ConversationError::InvalidBacktrackTarget(None);
        assert_eq!(err.to_string(), "invalid backtrack target: none available");
    }

    #[test]
    fn validation_errors_convert() {
        let err: ConversationError = ValidationError::empty_field("label").into();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }
}
