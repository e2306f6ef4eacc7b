//! Flow handler: strategy selection, action menus and backtracking.

use serde_json::{Map, Value};
use tracing::debug;

use super::action::FlowAction;
use super::backtrack::{self, LossAssessment};
use super::expertise::{self, ExpertiseAssessment};
use super::kind::FlowKind;
use crate::domain::conversation::{
    keys, ConversationError, ConversationSession, ConversationState, CourseFlowMachine,
};

/// Preference key carrying an explicit flow choice.
pub const USER_PREFERENCE_KEY: &str = "user_preference";
/// Preference key carrying a self-described experience level.
pub const EXPERIENCE_LEVEL_KEY: &str = "experience_level";

/// How a session's flow was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSelection {
    pub kind: FlowKind,
    /// Present when the flow was inferred rather than requested.
    pub assessment: Option<ExpertiseAssessment>,
}

/// Chooses flows and computes what the user can do next.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowHandler {
    machine: CourseFlowMachine,
}

impl FlowHandler {
    pub fn new(machine: CourseFlowMachine) -> Self {
        Self { machine }
    }

    pub fn machine(&self) -> &CourseFlowMachine {
        &self.machine
    }

    /// Picks the flow for a new session.
    ///
    /// An explicit, recognised `user_preference` wins; otherwise the stated
    /// `experience_level` is scored into an expertise label.
    pub fn select_flow(&self, preferences: &Map<String, Value>) -> FlowSelection {
        if let Some(kind) = preferences
            .get(USER_PREFERENCE_KEY)
            .and_then(Value::as_str)
            .and_then(|p| p.parse::<FlowKind>().ok())
        {
            return FlowSelection {
                kind,
                assessment: None,
            };
        }

        let stated = preferences
            .get(EXPERIENCE_LEVEL_KEY)
            .and_then(Value::as_str);
        let assessment = expertise::assess(&[], stated);
        FlowSelection {
            kind: FlowKind::for_expertise(assessment.level),
            assessment: Some(assessment),
        }
    }

    /// Scores the session's conversation so far.
    pub fn infer_expertise(&self, session: &ConversationSession) -> ExpertiseAssessment {
        let stated = session
            .context()
            .get_object(keys::PREFERENCES)
            .and_then(|p| p.get(EXPERIENCE_LEVEL_KEY))
            .and_then(Value::as_str);
        expertise::assess(session.messages(), stated)
    }

    /// State the session's flow would move to next.
    pub fn next_state(&self, session: &ConversationSession) -> Option<ConversationState> {
        if session.status().is_closed() {
            return None;
        }
        session.flow().strategy().next_state(session, &self.machine)
    }

    /// Action menu for the next turn. Closed sessions offer nothing.
    pub fn available_actions(&self, session: &ConversationSession) -> Vec<FlowAction> {
        if session.status().is_closed() {
            return Vec::new();
        }
        let actions = session
            .flow()
            .strategy()
            .available_actions(session, &self.machine);
        debug!(
            session_id = %session.id(),
            flow = %session.flow(),
            count = actions.len(),
            "Computed available actions"
        );
        actions
    }

    /// Describes what backtracking to `target` would discard.
    pub fn preview_backtrack(
        &self,
        session: &ConversationSession,
        target: Option<ConversationState>,
    ) -> Result<LossAssessment, ConversationError> {
        backtrack::plan(session, target).map(|plan| plan.assessment)
    }

    /// Backtracks to `target` (or the default target) and returns what was
    /// discarded.
    pub fn backtrack(
        &self,
        session: &mut ConversationSession,
        target: Option<ConversationState>,
    ) -> Result<LossAssessment, ConversationError> {
        let plan = backtrack::plan(session, target)?;
        Ok(backtrack::execute(session, plan))
    }
}
