//! Flow strategies.
//!
//! Each strategy answers two questions for a session: which state should
//! come next, and which actions to put in front of the user. Strategies never
//! mutate the session; the machine remains the only gate for transitions.

use std::fmt::Debug;

use super::action::FlowAction;
use super::backtrack;
use super::kind::FlowKind;
use crate::domain::conversation::progress::{missing_requirement_fields, needs_clarification};
use crate::domain::conversation::transitions::{self, Destination};
use crate::domain::conversation::{
    ConversationSession, ConversationState, CourseFlowMachine, Trigger,
};

/// Capability set shared by every flow.
pub trait FlowStrategy: Debug + Send + Sync {
    fn kind(&self) -> FlowKind;

    /// The state this flow would move to next, if it would move at all.
    fn next_state(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Option<ConversationState>;

    /// Actions to offer for the next turn.
    fn available_actions(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Vec<FlowAction>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearFlow;

#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveFlow;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExploratoryFlow;

#[derive(Debug, Clone, Copy, Default)]
pub struct GuidedFlow;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpertFlow;

impl FlowStrategy for LinearFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Linear
    }

    fn next_state(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Option<ConversationState> {
        ready_step(session, machine, true).map(|(_, target)| target)
    }

    fn available_actions(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Vec<FlowAction> {
        let mut actions = table_actions(session, machine);
        recommend_step(&mut actions, session, true);
        push_recovery(&mut actions, session);
        actions
    }
}

impl FlowStrategy for AdaptiveFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Adaptive
    }

    fn next_state(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Option<ConversationState> {
        if wants_clarification(session) {
            return machine
                .evaluate(session, Trigger::RefineRequirements)
                .ok();
        }
        furthest_skip(session, machine)
            .or_else(|| ready_step(session, machine, false).map(|(_, target)| target))
    }

    fn available_actions(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Vec<FlowAction> {
        let mut actions = table_actions(session, machine);

        if wants_clarification(session) {
            actions.insert(
                0,
                FlowAction::clarify(field_names(session)).recommend(),
            );
            push_recovery(&mut actions, session);
            return actions;
        }

        let step = ready_step(session, machine, false).map(|(_, target)| target);
        match furthest_skip(session, machine) {
            Some(skip) if Some(skip) != step => {
                actions.insert(0, FlowAction::transition(Trigger::JumpTo(skip), skip).recommend());
            }
            _ => recommend_step(&mut actions, session, false),
        }
        push_recovery(&mut actions, session);
        actions
    }
}

impl FlowStrategy for ExploratoryFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Exploratory
    }

    fn next_state(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Option<ConversationState> {
        ready_step(session, machine, false).map(|(_, target)| target)
    }

    fn available_actions(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Vec<FlowAction> {
        let mut actions = table_actions(session, machine);
        recommend_step(&mut actions, session, false);
        actions.extend(jump_actions(session, machine));
        push_recovery(&mut actions, session);
        actions
    }
}

impl FlowStrategy for GuidedFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Guided
    }

    fn next_state(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Option<ConversationState> {
        if wants_clarification(session) {
            return None;
        }
        ready_step(session, machine, false).map(|(_, target)| target)
    }

    /// Always the same menu shape: primary step, refinement, go back,
    /// help and pause.
    fn available_actions(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Vec<FlowAction> {
        let table = table_actions(session, machine);
        let find = |trigger: Trigger| table.iter().find(|a| a.trigger() == Some(trigger)).cloned();
        let clarify = wants_clarification(session);
        let mut menu = Vec::new();

        if clarify {
            menu.push(FlowAction::clarify(field_names(session)).recommend());
        }

        let primary = transitions::advance_trigger(session.current_state())
            .and_then(find)
            .or_else(|| find(Trigger::Resume));
        let primary_trigger = primary.as_ref().and_then(FlowAction::trigger);
        if let Some(primary) = primary {
            menu.push(if clarify { primary } else { primary.recommend() });
        }

        let refinement = [
            Trigger::RefineRequirements,
            Trigger::RefineStructure,
            Trigger::EnhanceContent,
        ]
        .into_iter()
        .filter(|t| Some(*t) != primary_trigger)
        .find_map(find);
        if let Some(refinement) = refinement {
            menu.push(refinement);
        }

        if let Some(target) = backtrack::default_target(session) {
            let action = FlowAction::backtrack(target);
            menu.push(if session.current_state() == ConversationState::Error {
                action.recommend()
            } else {
                action
            });
        }

        menu.push(FlowAction::help());

        if let Some(pause) = find(Trigger::Pause) {
            menu.push(pause);
        }
        menu
    }
}

impl FlowStrategy for ExpertFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Expert
    }

    fn next_state(
        &self,
        _session: &ConversationSession,
        _machine: &CourseFlowMachine,
    ) -> Option<ConversationState> {
        None
    }

    fn available_actions(
        &self,
        session: &ConversationSession,
        machine: &CourseFlowMachine,
    ) -> Vec<FlowAction> {
        let mut actions = table_actions(session, machine);
        actions.extend(jump_actions(session, machine));
        if let Some(target) = backtrack::default_target(session) {
            actions.push(FlowAction::backtrack(target));
        }
        actions
    }
}

// ───────────────────────────────────────────────────────────────
// Shared helpers
// ───────────────────────────────────────────────────────────────

/// One action per table trigger from the current state, enabled or blocked.
/// `Fail` is internal and never offered.
fn table_actions(session: &ConversationSession, machine: &CourseFlowMachine) -> Vec<FlowAction> {
    let state = session.current_state();
    transitions::valid_triggers(state)
        .into_iter()
        .filter(|trigger| *trigger != Trigger::Fail)
        .filter_map(|trigger| {
            let target = match transitions::destination(state, trigger)? {
                Destination::State(target) => target,
                Destination::StateBeforePause => session.state_before_pause()?,
            };
            Some(match machine.evaluate(session, trigger) {
                Ok(_) => FlowAction::transition(trigger, target),
                Err(err) => FlowAction::blocked(trigger, target, &err),
            })
        })
        .collect()
}

fn jump_actions(session: &ConversationSession, machine: &CourseFlowMachine) -> Vec<FlowAction> {
    let forward = transitions::advance_trigger(session.current_state())
        .and_then(|t| transitions::destination(session.current_state(), t));
    machine
        .ready_jumps(session)
        .into_iter()
        .filter(|target| forward != Some(Destination::State(*target)))
        .map(|target| FlowAction::transition(Trigger::JumpTo(target), target))
        .collect()
}

/// The step this flow takes next and its target, if the machine accepts it
/// now. Strict flows walk every linear state; the others step over
/// refinement loops.
fn ready_step(
    session: &ConversationSession,
    machine: &CourseFlowMachine,
    strict: bool,
) -> Option<(Trigger, ConversationState)> {
    let trigger = step_trigger(session.current_state(), strict)?;
    machine
        .evaluate(session, trigger)
        .ok()
        .map(|target| (trigger, target))
}

/// Furthest forward state reachable by skipping completed states.
fn furthest_skip(
    session: &ConversationSession,
    machine: &CourseFlowMachine,
) -> Option<ConversationState> {
    let current = session.current_state().linear_index()?;
    machine
        .ready_jumps(session)
        .into_iter()
        .filter(|s| s.linear_index().map(|i| i > current).unwrap_or(false))
        .max()
}

fn step_trigger(state: ConversationState, strict: bool) -> Option<Trigger> {
    if strict {
        transitions::forward_trigger(state)
    } else {
        transitions::advance_trigger(state)
    }
}

fn recommend_step(actions: &mut [FlowAction], session: &ConversationSession, strict: bool) {
    let forward = step_trigger(session.current_state(), strict).or_else(|| {
        (session.current_state() == ConversationState::Paused).then_some(Trigger::Resume)
    });
    if let Some(forward) = forward {
        for action in actions.iter_mut() {
            if action.trigger() == Some(forward) {
                action.recommended = action.enabled;
            }
        }
    }
}

/// In `Error` the only way forward is back.
fn push_recovery(actions: &mut Vec<FlowAction>, session: &ConversationSession) {
    if session.current_state() == ConversationState::Error {
        if let Some(target) = backtrack::default_target(session) {
            actions.insert(0, FlowAction::backtrack(target).recommend());
        }
    }
}

fn wants_clarification(session: &ConversationSession) -> bool {
    matches!(
        session.current_state(),
        ConversationState::RequirementsGathering | ConversationState::RequirementsRefinement
    ) && needs_clarification(session.context())
}

fn field_names(session: &ConversationSession) -> Vec<String> {
    missing_requirement_fields(session.context())
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{keys, SessionContext, SessionLimits};
    use crate::domain::flow::ActionKind;
    use crate::domain::foundation::UserId;
    use serde_json::json;

    fn session(flow: FlowKind) -> ConversationSession {
        ConversationSession::new(
            UserId::new("u1").unwrap(),
            flow,
            SessionContext::new(),
            SessionLimits::default(),
        )
    }

    fn recommended(actions: &[FlowAction]) -> Vec<&FlowAction> {
        actions.iter().filter(|a| a.recommended).collect()
    }

    #[test]
    fn linear_recommends_the_next_step_only() {
        let machine = CourseFlowMachine::default();
        let s = session(FlowKind::Linear);
        assert_eq!(
            LinearFlow.next_state(&s, &machine),
            Some(ConversationState::Welcome)
        );
        let actions = LinearFlow.available_actions(&s, &machine);
        let rec = recommended(&actions);
        assert_eq!(rec.len(), 1);
        assert_eq!(rec[0].trigger(), Some(Trigger::Begin));
        assert!(actions.iter().all(|a| !matches!(a.trigger(), Some(Trigger::JumpTo(_)))));
    }

    #[test]
    fn adaptive_skips_welcome_and_templates() {
        let machine = CourseFlowMachine::default();
        let s = session(FlowKind::Adaptive);
        assert_eq!(
            AdaptiveFlow.next_state(&s, &machine),
            Some(ConversationState::RequirementsGathering)
        );
    }

    #[test]
    fn adaptive_asks_for_clarification_when_unsure() {
        let machine = CourseFlowMachine::default();
        let mut s = session(FlowKind::Adaptive);
        machine.apply(&mut s, Trigger::DescribeCourse).unwrap();
        s.set_context(keys::REQUIREMENTS, json!({"lesson_count": 5}));

        assert_eq!(
            AdaptiveFlow.next_state(&s, &machine),
            Some(ConversationState::RequirementsRefinement)
        );
        let actions = AdaptiveFlow.available_actions(&s, &machine);
        match &actions[0].kind {
            ActionKind::Clarify { fields } => {
                assert_eq!(fields[0], "topic");
                assert!(actions[0].recommended);
            }
            other => panic!("expected clarify, got {:?}", other),
        }
    }

    #[test]
    fn blocked_actions_explain_missing_context() {
        let machine = CourseFlowMachine::default();
        let mut s = session(FlowKind::Linear);
        machine.apply(&mut s, Trigger::DescribeCourse).unwrap();
        let actions = LinearFlow.available_actions(&s, &machine);
        let generate = actions
            .iter()
            .find(|a| a.trigger() == Some(Trigger::GenerateStructure))
            .unwrap();
        assert!(!generate.enabled);
        assert_eq!(generate.reason.as_deref(), Some("needs requirements"));
    }

    #[test]
    fn exploratory_offers_jumps() {
        let machine = CourseFlowMachine::default();
        let s = session(FlowKind::Exploratory);
        let actions = ExploratoryFlow.available_actions(&s, &machine);
        assert!(actions.iter().any(|a| a.trigger()
            == Some(Trigger::JumpTo(ConversationState::RequirementsGathering))));
    }

    #[test]
    fn guided_menu_has_fixed_shape() {
        let machine = CourseFlowMachine::default();
        let mut s = session(FlowKind::Guided);
        machine.apply(&mut s, Trigger::DescribeCourse).unwrap();
        s.set_context(
            keys::REQUIREMENTS,
            json!({"topic": "python", "target_audience": "beginners"}),
        );
        let menu = GuidedFlow.available_actions(&s, &machine);
        let kinds: Vec<_> = menu.iter().map(|a| a.kind.clone()).collect();

        assert_eq!(menu[0].trigger(), Some(Trigger::GenerateStructure));
        assert!(menu[0].recommended);
        assert_eq!(menu[1].trigger(), Some(Trigger::RefineRequirements));
        assert!(kinds.contains(&ActionKind::Backtrack {
            target: ConversationState::Initial
        }));
        assert!(kinds.contains(&ActionKind::Help));
        assert_eq!(menu.last().and_then(|a| a.trigger()), Some(Trigger::Pause));
    }

    #[test]
    fn expert_never_recommends() {
        let machine = CourseFlowMachine::default();
        let s = session(FlowKind::Expert);
        assert_eq!(ExpertFlow.next_state(&s, &machine), None);
        let actions = ExpertFlow.available_actions(&s, &machine);
        assert!(recommended(&actions).is_empty());
        assert!(actions.len() > 3);
    }

    #[test]
    fn error_state_recommends_going_back() {
        let machine = CourseFlowMachine::default();
        let mut s = session(FlowKind::Linear);
        machine.apply(&mut s, Trigger::DescribeCourse).unwrap();
        machine.fail(&mut s, "boom");
        let actions = LinearFlow.available_actions(&s, &machine);
        assert_eq!(
            actions[0].kind,
            ActionKind::Backtrack {
                target: ConversationState::RequirementsGathering
            }
        );
        assert!(actions[0].recommended);
    }
}
