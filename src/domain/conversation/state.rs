//! Course-generation conversation states.
//!
//! The closed set of phases a course-creation conversation moves through,
//! ordered along a linear happy path with three off-path states (`Error`,
//! `Paused`, `Abandoned`) reachable from anywhere non-terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::keys;
use super::transitions;
use crate::domain::foundation::StateMachine;

/// Phase of a course-creation conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Initial,
    Welcome,
    TemplateSelection,
    RequirementsGathering,
    RequirementsRefinement,
    StructureGeneration,
    StructureReview,
    StructureRefinement,
    ContentGeneration,
    ContentReview,
    ContentEnhancement,
    QualityValidation,
    FinalReview,
    WordpressCreation,
    Completed,
    Error,
    Paused,
    Abandoned,
}

impl ConversationState {
    /// The happy path, in order.
    pub const LINEAR: [ConversationState; 15] = [
        Self::Initial,
        Self::Welcome,
        Self::TemplateSelection,
        Self::RequirementsGathering,
        Self::RequirementsRefinement,
        Self::StructureGeneration,
        Self::StructureReview,
        Self::StructureRefinement,
        Self::ContentGeneration,
        Self::ContentReview,
        Self::ContentEnhancement,
        Self::QualityValidation,
        Self::FinalReview,
        Self::WordpressCreation,
        Self::Completed,
    ];

    /// Every state, linear path first.
    pub const ALL: [ConversationState; 18] = [
        Self::Initial,
        Self::Welcome,
        Self::TemplateSelection,
        Self::RequirementsGathering,
        Self::RequirementsRefinement,
        Self::StructureGeneration,
        Self::StructureReview,
        Self::StructureRefinement,
        Self::ContentGeneration,
        Self::ContentReview,
        Self::ContentEnhancement,
        Self::QualityValidation,
        Self::FinalReview,
        Self::WordpressCreation,
        Self::Completed,
        Self::Error,
        Self::Paused,
        Self::Abandoned,
    ];

    /// Position on the linear path, `None` for off-path states.
    pub fn linear_index(&self) -> Option<usize> {
        Self::LINEAR.iter().position(|s| s == self)
    }

    /// Returns true for states on the happy path.
    pub fn is_linear(&self) -> bool {
        self.linear_index().is_some()
    }

    /// The next state on the happy path, if any.
    pub fn next_linear(&self) -> Option<ConversationState> {
        self.linear_index()
            .and_then(|i| Self::LINEAR.get(i + 1))
            .copied()
    }

    /// Returns true for the self-looping refinement states.
    pub fn is_refinement(&self) -> bool {
        matches!(
            self,
            Self::RequirementsRefinement | Self::StructureRefinement | Self::ContentEnhancement
        )
    }

    /// Returns true if nothing leaves this state except a new session.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Context keys that must be present before this state can be entered.
    pub fn required_context(&self) -> &'static [&'static str] {
        match self {
            Self::RequirementsRefinement | Self::StructureGeneration => &[keys::REQUIREMENTS],
            Self::StructureReview | Self::StructureRefinement | Self::ContentGeneration => {
                &[keys::COURSE_STRUCTURE]
            }
            Self::ContentReview | Self::ContentEnhancement | Self::QualityValidation => {
                &[keys::LESSON_CONTENT]
            }
            Self::FinalReview => &[keys::QUALITY_REPORT],
            Self::WordpressCreation => &[keys::COURSE_STRUCTURE, keys::QUALITY_REPORT],
            Self::Completed => &[keys::CREATED_COURSE_ID],
            _ => &[],
        }
    }

    /// Context keys this state is responsible for producing.
    pub fn produced_context(&self) -> &'static [&'static str] {
        match self {
            Self::RequirementsGathering | Self::RequirementsRefinement => &[keys::REQUIREMENTS],
            Self::StructureGeneration | Self::StructureReview | Self::StructureRefinement => {
                &[keys::COURSE_STRUCTURE]
            }
            Self::ContentGeneration | Self::ContentReview | Self::ContentEnhancement => {
                &[keys::LESSON_CONTENT]
            }
            Self::QualityValidation => &[keys::QUALITY_REPORT],
            Self::WordpressCreation => &[keys::CREATED_COURSE_ID],
            _ => &[],
        }
    }

    /// Required and produced keys together, without duplicates.
    pub fn tracked_context(&self) -> Vec<&'static str> {
        let mut tracked: Vec<&'static str> = self.required_context().to_vec();
        for key in self.produced_context() {
            if !tracked.contains(key) {
                tracked.push(key);
            }
        }
        tracked
    }

    /// Human-readable label for UI display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initial => "Getting started",
            Self::Welcome => "Welcome",
            Self::TemplateSelection => "Choosing a template",
            Self::RequirementsGathering => "Gathering requirements",
            Self::RequirementsRefinement => "Refining requirements",
            Self::StructureGeneration => "Generating course structure",
            Self::StructureReview => "Reviewing course structure",
            Self::StructureRefinement => "Refining course structure",
            Self::ContentGeneration => "Generating lesson content",
            Self::ContentReview => "Reviewing lesson content",
            Self::ContentEnhancement => "Enhancing lesson content",
            Self::QualityValidation => "Validating quality",
            Self::FinalReview => "Final review",
            Self::WordpressCreation => "Creating the course",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Paused => "Paused",
            Self::Abandoned => "Abandoned",
        }
    }
}

impl ConversationState {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Welcome => "welcome",
            Self::TemplateSelection => "template_selection",
            Self::RequirementsGathering => "requirements_gathering",
            Self::RequirementsRefinement => "requirements_refinement",
            Self::StructureGeneration => "structure_generation",
            Self::StructureReview => "structure_review",
            Self::StructureRefinement => "structure_refinement",
            Self::ContentGeneration => "content_generation",
            Self::ContentReview => "content_review",
            Self::ContentEnhancement => "content_enhancement",
            Self::QualityValidation => "quality_validation",
            Self::FinalReview => "final_review",
            Self::WordpressCreation => "wordpress_creation",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Paused => "paused",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for ConversationState {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Every state some trigger can lead to. `Paused` may resume into any
    /// non-final linear state, depending on where the pause started.
    fn valid_transitions(&self) -> Vec<Self> {
        let mut targets = Vec::new();
        for target in Self::ALL {
            if transitions::reachable_in_one_step(*self, target) && !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_initial() {
        assert_eq!(ConversationState::default(), ConversationState::Initial);
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&ConversationState::WordpressCreation).unwrap();
        assert_eq!(json, "\"wordpress_creation\"");
        assert_eq!(
            ConversationState::RequirementsGathering.to_string(),
            "requirements_gathering"
        );
    }

    #[test]
    fn as_str_matches_serde_for_every_state() {
        for state in ConversationState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }

    #[test]
    fn linear_path_is_ordered() {
        assert_eq!(ConversationState::Initial.linear_index(), Some(0));
        assert_eq!(ConversationState::Completed.linear_index(), Some(14));
        assert_eq!(ConversationState::Error.linear_index(), None);
        assert_eq!(
            ConversationState::StructureGeneration.next_linear(),
            Some(ConversationState::StructureReview)
        );
        assert_eq!(ConversationState::Completed.next_linear(), None);
    }

    #[test]
    fn refinement_states_are_the_three_loops() {
        let loops: Vec<_> = ConversationState::ALL
            .iter()
            .filter(|s| s.is_refinement())
            .collect();
        assert_eq!(loops.len(), 3);
    }

    #[test]
    fn structure_generation_requires_requirements() {
        assert_eq!(
            ConversationState::StructureGeneration.required_context(),
            &[keys::REQUIREMENTS]
        );
    }

    #[test]
    fn tracked_context_deduplicates() {
        let tracked = ConversationState::StructureReview.tracked_context();
        assert_eq!(tracked, vec![keys::COURSE_STRUCTURE]);
    }

    #[test]
    fn completed_and_abandoned_are_terminal() {
        assert!(ConversationState::Completed.is_terminal());
        assert!(ConversationState::Abandoned.is_terminal());
        assert!(!ConversationState::Error.is_terminal());
        assert!(!ConversationState::Paused.is_terminal());
    }

    #[test]
    fn error_only_leads_to_abandoned() {
        assert_eq!(
            ConversationState::Error.valid_transitions(),
            vec![ConversationState::Abandoned]
        );
    }

    #[test]
    fn every_non_final_state_can_be_abandoned() {
        for state in ConversationState::ALL.iter().filter(|s| !s.is_final()) {
            assert!(
                state.can_transition_to(&ConversationState::Abandoned),
                "{:?} should reach Abandoned",
                state
            );
        }
    }
}
