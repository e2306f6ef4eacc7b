//! Course-generation state machine.
//!
//! Validates a trigger against the transition table, the session's
//! status, context prerequisites and the refinement cap, then applies it.

use tracing::{debug, warn};

use super::history::HistoryEvent;
use super::progress;
use super::transitions::{self, Destination};
use super::{ConversationError, ConversationSession, ConversationState, Trigger};
use crate::domain::flow::JumpPolicy;
use crate::domain::foundation::SessionStatus;

/// Default number of times each refinement state may be entered.
pub const DEFAULT_MAX_REFINEMENT_ITERATIONS: u32 = 10;

/// Outcome of an applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    pub from: ConversationState,
    pub to: ConversationState,
    pub trigger: Trigger,
}

/// Evaluates and applies triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseFlowMachine {
    max_refinement_iterations: u32,
}

impl Default for CourseFlowMachine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REFINEMENT_ITERATIONS)
    }
}

impl CourseFlowMachine {
    pub fn new(max_refinement_iterations: u32) -> Self {
        Self {
            max_refinement_iterations: max_refinement_iterations.max(1),
        }
    }

    pub fn max_refinement_iterations(&self) -> u32 {
        self.max_refinement_iterations
    }

    /// Determines where `trigger` would take `session` without changing it.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the trigger does not apply to the current
    ///   state, the session is closed, or the flow forbids the jump
    /// - `InvalidStatusTransition` for forward triggers on a paused session
    /// - `MissingContext` if the target's prerequisites are absent
    /// - `RefinementLimitReached` once a refinement loop hits its cap
    ///
    /// An `InvalidTransition` lists the payload-free triggers that would
    /// succeed right now.
    pub fn evaluate(
        &self,
        session: &ConversationSession,
        trigger: Trigger,
    ) -> Result<ConversationState, ConversationError> {
        self.resolve(session, trigger).map_err(|err| match err {
            ConversationError::InvalidTransition { state, trigger, .. } => {
                ConversationError::InvalidTransition {
                    state,
                    trigger,
                    valid_triggers: self.ready_triggers(session),
                }
            }
            other => other,
        })
    }

    /// `evaluate` without filling in the list of valid triggers.
    fn resolve(
        &self,
        session: &ConversationSession,
        trigger: Trigger,
    ) -> Result<ConversationState, ConversationError> {
        let state = session.current_state();

        if session.status().is_closed() {
            return Err(refused(state, trigger));
        }

        if session.status() == SessionStatus::Paused
            && state != ConversationState::Paused
            && !trigger.is_lifecycle()
        {
            return Err(ConversationError::InvalidStatusTransition {
                from: SessionStatus::Paused,
                to: SessionStatus::Active,
            });
        }

        if let Trigger::JumpTo(target) = trigger {
            let permitted = match session.flow().jump_policy() {
                JumpPolicy::Never => false,
                JumpPolicy::SkipCompleted => {
                    progress::skips_only_completed(state, target, session.context())
                }
                JumpPolicy::Anywhere => true,
            };
            if !permitted {
                return Err(refused(state, trigger));
            }
        }

        let target = match transitions::destination(state, trigger) {
            Some(Destination::State(target)) => target,
            Some(Destination::StateBeforePause) => session
                .state_before_pause()
                .ok_or_else(|| refused(state, trigger))?,
            None => return Err(refused(state, trigger)),
        };

        let missing = session.context().missing(target.required_context());
        if !missing.is_empty() {
            return Err(ConversationError::MissingContext { target, missing });
        }

        if target.is_refinement()
            && trigger != Trigger::Resume
            && session.refinement_count(target) >= self.max_refinement_iterations
        {
            return Err(ConversationError::RefinementLimitReached {
                state: target,
                limit: self.max_refinement_iterations,
            });
        }

        Ok(target)
    }

    /// Validates and applies `trigger`. On error the session is untouched.
    pub fn apply(
        &self,
        session: &mut ConversationSession,
        trigger: Trigger,
    ) -> Result<TransitionRecord, ConversationError> {
        let from = session.current_state();
        let to = match self.evaluate(session, trigger) {
            Ok(to) => to,
            Err(err) => {
                warn!(
                    session_id = %session.id(),
                    state = %from,
                    trigger = %trigger,
                    error = %err,
                    "Transition refused"
                );
                return Err(err);
            }
        };

        session.enter_state(to, HistoryEvent::Transition { from, trigger });
        debug!(session_id = %session.id(), from = %from, to = %to, "Transition applied");

        Ok(TransitionRecord { from, to, trigger })
    }

    /// Moves the session to `Error`, recording `reason`.
    ///
    /// A session already in `Error` just has its reason updated.
    pub fn fail(&self, session: &mut ConversationSession, reason: impl Into<String>) {
        let reason = reason.into();
        let from = session.current_state();
        session.record_error(reason.clone());
        if from != ConversationState::Error && !from.is_final() {
            session.enter_state(
                ConversationState::Error,
                HistoryEvent::Transition {
                    from,
                    trigger: Trigger::Fail,
                },
            );
        }
        warn!(session_id = %session.id(), state = %from, reason = %reason, "Session moved to error");
    }

    /// Payload-free triggers that would currently succeed.
    pub fn ready_triggers(&self, session: &ConversationSession) -> Vec<Trigger> {
        Trigger::FIXED
            .iter()
            .copied()
            .filter(|t| self.resolve(session, *t).is_ok())
            .collect()
    }

    /// Jump targets that would currently succeed.
    pub fn ready_jumps(&self, session: &ConversationSession) -> Vec<ConversationState> {
        ConversationState::LINEAR
            .iter()
            .copied()
            .filter(|s| self.resolve(session, Trigger::JumpTo(*s)).is_ok())
            .collect()
    }
}

fn refused(state: ConversationState, trigger: Trigger) -> ConversationError {
    ConversationError::InvalidTransition {
        state,
        trigger,
        valid_triggers: Vec::new(),
    }
}
