//! Progress and confidence scoring.
//!
//! Both are pure functions of the session's state and context; nothing else
//! may set them.

use super::context::{is_present, keys};
use super::{ConversationState, SessionContext};
use crate::domain::foundation::{Confidence, Percentage};

/// Below this confidence, adaptive and guided flows ask for clarification.
pub const CLARIFICATION_THRESHOLD: f64 = 0.5;

/// Share of a step credited for a state's context being complete.
const COMPLETENESS_WEIGHT: f64 = 0.9;

/// Requirement fields and their contribution to confidence. Sums to 1.0.
pub const REQUIREMENT_WEIGHTS: [(&str, f64); 6] = [
    ("topic", 0.3),
    ("target_audience", 0.2),
    ("difficulty_level", 0.15),
    ("learning_objectives", 0.15),
    ("lesson_count", 0.1),
    ("duration", 0.1),
];

/// Completion estimate for a conversation in `state` carrying `context`.
pub fn progress(state: ConversationState, context: &SessionContext) -> Percentage {
    let effective = if state.is_linear() {
        state
    } else {
        deepest_satisfied_state(context)
    };

    let position = effective.linear_index().unwrap_or(0) as f64;
    let last = (ConversationState::LINEAR.len() - 1) as f64;
    let score = (position + COMPLETENESS_WEIGHT * completeness(effective, context)) / last;
    Percentage::from_fraction(score.min(1.0))
}

/// Fraction of `state`'s tracked keys that are present. A state that tracks
/// nothing counts as complete.
pub fn completeness(state: ConversationState, context: &SessionContext) -> f64 {
    let tracked = state.tracked_context();
    if tracked.is_empty() {
        return 1.0;
    }
    let present = tracked.iter().filter(|key| context.has(key)).count();
    present as f64 / tracked.len() as f64
}

/// Deepest state along the happy path such that every state up to and
/// including it has its required context satisfied.
pub fn deepest_satisfied_state(context: &SessionContext) -> ConversationState {
    let mut deepest = ConversationState::Initial;
    for state in ConversationState::LINEAR {
        if !context.missing(state.required_context()).is_empty() {
            break;
        }
        deepest = state;
    }
    deepest
}

/// Returns true if jumping from `from` forward to `target` only passes over
/// states (the one being left included) whose tracked context is complete.
pub fn skips_only_completed(
    from: ConversationState,
    target: ConversationState,
    context: &SessionContext,
) -> bool {
    match (from.linear_index(), target.linear_index()) {
        (Some(start), Some(end)) if end > start => ConversationState::LINEAR[start..end]
            .iter()
            .all(|state| completeness(*state, context) >= 1.0),
        _ => false,
    }
}

/// How well-formed the collected requirements are.
///
/// Reads fields from `context.requirements`, falling back to the top-level
/// `topic` for the topic field.
pub fn confidence(context: &SessionContext) -> Confidence {
    let requirements = context.get_object(keys::REQUIREMENTS);
    let field_present = |field: &str| -> bool {
        let nested = requirements
            .and_then(|r| r.get(field))
            .map(is_present)
            .unwrap_or(false);
        nested || (field == keys::TOPIC && context.has(keys::TOPIC))
    };

    let score: f64 = REQUIREMENT_WEIGHTS
        .iter()
        .filter(|(field, _)| field_present(*field))
        .map(|(_, weight)| weight)
        .sum();
    Confidence::new(score)
}

/// Requirement fields that are still missing, heaviest first.
pub fn missing_requirement_fields(context: &SessionContext) -> Vec<&'static str> {
    let requirements = context.get_object(keys::REQUIREMENTS);
    REQUIREMENT_WEIGHTS
        .iter()
        .filter(|(field, _)| {
            !requirements
                .and_then(|r| r.get(*field))
                .map(is_present)
                .unwrap_or(false)
        })
        .map(|(field, _)| *field)
        .filter(|field| !(*field == keys::TOPIC && context.has(keys::TOPIC)))
        .collect()
}

/// Convenience used by flows deciding whether to ask a follow-up question.
pub fn needs_clarification(context: &SessionContext) -> bool {
    !confidence(context).meets(CLARIFICATION_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn initial_with_empty_context_is_about_six_percent() {
        // Initial tracks nothing, so its step counts as complete: 0.9 / 14.
        let p = progress(ConversationState::Initial, &SessionContext::new());
        assert_eq!(p.value(), 6);
    }

    #[test]
    fn completed_with_course_id_is_full() {
        let mut context = SessionContext::new();
        context.set(keys::CREATED_COURSE_ID, json!(42));
        assert_eq!(
            progress(ConversationState::Completed, &context),
            Percentage::HUNDRED
        );
    }

    #[test]
    fn requirements_raise_progress_within_gathering() {
        let empty = progress(
            ConversationState::RequirementsGathering,
            &SessionContext::new(),
        );
        let mut context = SessionContext::new();
        context.set(keys::REQUIREMENTS, json!({"topic": "python"}));
        let filled = progress(ConversationState::RequirementsGathering, &context);
        assert!(filled > empty);
        assert!(empty.value() > 0);
    }

    #[test]
    fn paused_uses_deepest_satisfied_prefix() {
        let mut context = SessionContext::new();
        context.set(keys::REQUIREMENTS, json!({"topic": "python"}));
        assert_eq!(
            deepest_satisfied_state(&context),
            ConversationState::StructureGeneration
        );
        // A course id alone does not skip the whole path.
        let mut odd = SessionContext::new();
        odd.set(keys::CREATED_COURSE_ID, json!(1));
        assert_eq!(
            deepest_satisfied_state(&odd),
            ConversationState::RequirementsGathering
        );
    }

    #[test]
    fn confidence_weights_requirement_fields() {
        let mut context = SessionContext::new();
        assert_eq!(confidence(&context), Confidence::NONE);
        assert!(needs_clarification(&context));

        context.set(
            keys::REQUIREMENTS,
            json!({"topic": "python", "target_audience": "beginners"}),
        );
        assert!((confidence(&context).value() - 0.5).abs() < 1e-9);
        assert!(!needs_clarification(&context));
    }

    #[test]
    fn top_level_topic_counts_for_topic_weight() {
        let mut context = SessionContext::new();
        context.set(keys::TOPIC, json!("rust"));
        assert!((confidence(&context).value() - 0.3).abs() < 1e-9);
        assert!(!missing_requirement_fields(&context).contains(&"topic"));
    }

    fn arb_state() -> impl Strategy<Value = ConversationState> {
        (0..ConversationState::ALL.len()).prop_map(|i| ConversationState::ALL[i])
    }

    fn arb_key() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            keys::REQUIREMENTS,
            keys::COURSE_STRUCTURE,
            keys::LESSON_CONTENT,
            keys::QUALITY_REPORT,
            keys::CREATED_COURSE_ID,
            keys::TOPIC,
            "notes",
        ])
    }

    proptest! {
        #[test]
        fn adding_keys_never_decreases_progress(
            state in arb_state(),
            initial in prop::collection::vec(arb_key(), 0..5),
            added in arb_key(),
        ) {
            let mut context = SessionContext::new();
            for key in &initial {
                context.set(*key, json!({"filled": true}));
            }
            let before = progress(state, &context);
            if !context.has(added) {
                context.set(added, json!({"filled": true}));
            }
            let after = progress(state, &context);
            prop_assert!(after >= before, "{:?}: {} -> {}", state, before, after);
        }

        #[test]
        fn progress_stays_in_bounds(state in arb_state(), keys in prop::collection::vec(arb_key(), 0..7)) {
            let mut context = SessionContext::new();
            for key in keys {
                context.set(key, json!("x"));
            }
            prop_assert!(progress(state, &context).value() <= 100);
        }
    }
}
