//! The course-generation transition table.
//!
//! `(state, trigger) -> destination` as one explicit mapping. Context
//! prerequisites and refinement caps are checked by the machine, not here.

use super::{ConversationState, Trigger};

use ConversationState as S;

/// Where a valid trigger leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A fixed state.
    State(ConversationState),
    /// Whatever state the conversation was in when it was paused.
    StateBeforePause,
}

/// Looks up the destination of `trigger` from `from`.
///
/// Returns `None` when the trigger is not semantically compatible with the
/// current state.
pub fn destination(from: ConversationState, trigger: Trigger) -> Option<Destination> {
    use Destination::State;

    if from.is_final() {
        return None;
    }

    let to = match (from, trigger) {
        (S::Initial, Trigger::Begin) => S::Welcome,
        (S::Welcome, Trigger::BrowseTemplates) => S::TemplateSelection,
        (S::Initial | S::Welcome | S::TemplateSelection, Trigger::DescribeCourse) => {
            S::RequirementsGathering
        }
        (S::RequirementsGathering | S::RequirementsRefinement, Trigger::RefineRequirements) => {
            S::RequirementsRefinement
        }
        (S::RequirementsGathering | S::RequirementsRefinement, Trigger::GenerateStructure) => {
            S::StructureGeneration
        }
        (S::StructureGeneration, Trigger::StructureReady) => S::StructureReview,
        (S::StructureReview | S::StructureRefinement, Trigger::RefineStructure) => {
            S::StructureRefinement
        }
        (S::StructureReview | S::StructureRefinement, Trigger::ApproveStructure) => {
            S::ContentGeneration
        }
        (S::ContentGeneration, Trigger::ContentReady) => S::ContentReview,
        (
            S::ContentReview | S::ContentEnhancement | S::QualityValidation,
            Trigger::EnhanceContent,
        ) => S::ContentEnhancement,
        (S::ContentReview | S::ContentEnhancement, Trigger::ApproveContent) => {
            S::QualityValidation
        }
        (S::QualityValidation, Trigger::QualityPassed) => S::FinalReview,
        (S::FinalReview, Trigger::ConfirmCreation) => S::WordpressCreation,
        (S::WordpressCreation, Trigger::CreationSucceeded) => S::Completed,

        (from, Trigger::JumpTo(target)) if is_jump_allowed(from, target) => target,

        (S::Paused, Trigger::Resume) => return Some(Destination::StateBeforePause),
        (from, Trigger::Pause) if !matches!(from, S::Paused | S::Error) => S::Paused,
        (from, Trigger::Fail) if from != S::Error => S::Error,
        (_, Trigger::Abandon) => S::Abandoned,

        _ => return None,
    };

    Some(State(to))
}

/// Jumps stay on the linear path, never land on the start or the end, and
/// never start from an off-path state.
fn is_jump_allowed(from: ConversationState, target: ConversationState) -> bool {
    from.is_linear()
        && target.is_linear()
        && from != target
        && !matches!(target, S::Initial | S::Completed)
}

/// Payload-free triggers the table accepts from `from`, in declaration order.
pub fn valid_triggers(from: ConversationState) -> Vec<Trigger> {
    Trigger::FIXED
        .iter()
        .copied()
        .filter(|t| destination(from, *t).is_some())
        .collect()
}

/// Returns true if some trigger (jumps and resumes included) leads from
/// `from` to `to`.
pub fn reachable_in_one_step(from: ConversationState, to: ConversationState) -> bool {
    if destination(from, Trigger::JumpTo(to)).is_some() {
        return true;
    }
    Trigger::FIXED.iter().any(|t| match destination(from, *t) {
        Some(Destination::State(s)) => s == to,
        Some(Destination::StateBeforePause) => to.is_linear() && !to.is_final(),
        None => false,
    })
}

/// The trigger that moves `from` one step along the happy path, if any.
pub fn forward_trigger(from: ConversationState) -> Option<Trigger> {
    let next = from.next_linear()?;
    Trigger::FIXED
        .iter()
        .copied()
        .filter(|t| !t.is_lifecycle())
        .find(|t| destination(from, *t) == Some(Destination::State(next)))
}

/// The trigger that makes real progress from `from`: the nearest forward
/// move that does not enter a refinement loop. Differs from
/// [`forward_trigger`] only where the next linear state is a refinement.
pub fn advance_trigger(from: ConversationState) -> Option<Trigger> {
    let start = from.linear_index()?;
    Trigger::FIXED
        .iter()
        .copied()
        .filter(|t| !t.is_lifecycle())
        .filter_map(|t| match destination(from, t) {
            Some(Destination::State(to)) if !to.is_refinement() => {
                to.linear_index().filter(|i| *i > start).map(|i| (i, t))
            }
            _ => None,
        })
        .min_by_key(|(index, _)| *index)
        .map(|(_, t)| t)
}
