//! Actions a flow offers the caller for the next turn.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{ConversationError, ConversationState, Trigger};

/// What an action does when chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Fire a trigger.
    Transition {
        trigger: Trigger,
        target: ConversationState,
    },
    /// Ask the user for the listed requirement fields.
    Clarify { fields: Vec<String> },
    /// Go back to an earlier state.
    Backtrack { target: ConversationState },
    /// Show help for the current state.
    Help,
}

/// One entry in the caller's action menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAction {
    pub kind: ActionKind,
    pub label: String,
    pub enabled: bool,
    pub recommended: bool,
    /// Why a disabled action cannot be taken yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FlowAction {
    /// An enabled transition action.
    pub fn transition(trigger: Trigger, target: ConversationState) -> Self {
        Self {
            kind: ActionKind::Transition { trigger, target },
            label: trigger.label(),
            enabled: true,
            recommended: false,
            reason: None,
        }
    }

    /// A transition the machine currently refuses, with the refusal as the
    /// reason.
    pub fn blocked(trigger: Trigger, target: ConversationState, err: &ConversationError) -> Self {
        let reason = match err {
            ConversationError::MissingContext { missing, .. } => {
                format!("needs {}", missing.join(", "))
            }
            other => other.to_string(),
        };
        Self {
            enabled: false,
            reason: Some(reason),
            ..Self::transition(trigger, target)
        }
    }

    pub fn clarify(fields: Vec<String>) -> Self {
        Self {
            kind: ActionKind::Clarify { fields },
            label: "Tell me more about your course".to_string(),
            enabled: true,
            recommended: false,
            reason: None,
        }
    }

    pub fn backtrack(target: ConversationState) -> Self {
        Self {
            kind: ActionKind::Backtrack { target },
            label: format!("Go back to {}", target.label().to_lowercase()),
            enabled: true,
            recommended: false,
            reason: None,
        }
    }

    pub fn help() -> Self {
        Self {
            kind: ActionKind::Help,
            label: "Help".to_string(),
            enabled: true,
            recommended: false,
            reason: None,
        }
    }

    pub fn recommend(mut self) -> Self {
        self.recommended = self.enabled;
        self
    }

    /// Trigger fired by this action, if it is a transition.
    pub fn trigger(&self) -> Option<Trigger> {
        match &self.kind {
            ActionKind::Transition { trigger, .. } => Some(*trigger),
            _ => None,
        }
    }
}
