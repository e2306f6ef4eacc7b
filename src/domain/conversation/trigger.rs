//! Triggers: the events a conversation state machine evaluates.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ConversationState;

/// An event, usually derived from a user message or a UI action, that may
/// move a conversation to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Begin,
    BrowseTemplates,
    DescribeCourse,
    RefineRequirements,
    GenerateStructure,
    StructureReady,
    RefineStructure,
    ApproveStructure,
    ContentReady,
    EnhanceContent,
    ApproveContent,
    QualityPassed,
    ConfirmCreation,
    CreationSucceeded,
    /// Free jump to a linear state; only honoured by flows that allow it.
    JumpTo(ConversationState),
    Pause,
    Resume,
    Fail,
    Abandon,
}

impl Trigger {
    /// Every trigger that carries no payload.
    pub const FIXED: [Trigger; 18] = [
        Trigger::Begin,
        Trigger::BrowseTemplates,
        Trigger::DescribeCourse,
        Trigger::RefineRequirements,
        Trigger::GenerateStructure,
        Trigger::StructureReady,
        Trigger::RefineStructure,
        Trigger::ApproveStructure,
        Trigger::ContentReady,
        Trigger::EnhanceContent,
        Trigger::ApproveContent,
        Trigger::QualityPassed,
        Trigger::ConfirmCreation,
        Trigger::CreationSucceeded,
        Trigger::Pause,
        Trigger::Resume,
        Trigger::Fail,
        Trigger::Abandon,
    ];

    /// Returns true for lifecycle triggers that leave the happy path.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Trigger::Pause | Trigger::Resume | Trigger::Fail | Trigger::Abandon
        )
    }

    /// Returns true for the jump trigger.
    pub fn is_jump(&self) -> bool {
        matches!(self, Trigger::JumpTo(_))
    }

    /// Short label suitable for buttons.
    pub fn label(&self) -> String {
        match self {
            Trigger::Begin => "Get started".to_string(),
            Trigger::BrowseTemplates => "Browse templates".to_string(),
            Trigger::DescribeCourse => "Describe your course".to_string(),
            Trigger::RefineRequirements => "Refine requirements".to_string(),
            Trigger::GenerateStructure => "Generate course structure".to_string(),
            Trigger::StructureReady => "Review structure".to_string(),
            Trigger::RefineStructure => "Refine structure".to_string(),
            Trigger::ApproveStructure => "Approve structure".to_string(),
            Trigger::ContentReady => "Review lesson content".to_string(),
            Trigger::EnhanceContent => "Enhance content".to_string(),
            Trigger::ApproveContent => "Approve content".to_string(),
            Trigger::QualityPassed => "Continue to final review".to_string(),
            Trigger::ConfirmCreation => "Create course".to_string(),
            Trigger::CreationSucceeded => "Finish".to_string(),
            Trigger::JumpTo(state) => format!("Jump to {}", state.label().to_lowercase()),
            Trigger::Pause => "Pause".to_string(),
            Trigger::Resume => "Resume".to_string(),
            Trigger::Fail => "Report failure".to_string(),
            Trigger::Abandon => "Abandon".to_string(),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::JumpTo(state) => write!(f, "jump_to({})", state),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_triggers_serialize_as_strings() {
        let json = serde_json::to_string(&Trigger::GenerateStructure).unwrap();
        assert_eq!(json, "\"generate_structure\"");
    }

    #[test]
    fn jump_serializes_with_target() {
        let json = serde_json::to_string(&Trigger::JumpTo(ConversationState::FinalReview)).unwrap();
        assert_eq!(json, "{\"jump_to\":\"final_review\"}");
        let back: Trigger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Trigger::JumpTo(ConversationState::FinalReview));
    }

    #[test]
    fn fixed_list_has_no_jumps_and_no_duplicates() {
        for (i, a) in Trigger::FIXED.iter().enumerate() {
            assert!(!a.is_jump());
            for b in &Trigger::FIXED[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn lifecycle_triggers_are_flagged() {
        assert!(Trigger::Pause.is_lifecycle());
        assert!(Trigger::Abandon.is_lifecycle());
        assert!(!Trigger::ApproveStructure.is_lifecycle());
    }
}
