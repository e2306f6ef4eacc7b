//! Backtracking: rolling a session back to an earlier recorded state.
//!
//! A backtrack is planned first, producing a [`LossAssessment`] the caller
//! can show before confirming. Applying it appends a history entry instead
//! of truncating, so forward history stays available.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::conversation::{
    ConversationError, ConversationSession, ConversationState, HistoryEvent, SessionContext,
    StateHistoryEntry,
};
use crate::domain::foundation::{SessionStatus, Timestamp};

/// What a backtrack would discard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossAssessment {
    pub from_state: ConversationState,
    pub target_state: ConversationState,
    /// When the target state was entered.
    pub target_entered_at: Timestamp,
    /// Keys populated after the target snapshot; they will be removed.
    pub lost_keys: Vec<String>,
    /// Keys whose value changed after the snapshot; they will revert.
    pub reverted_keys: Vec<String>,
    /// User-visible messages exchanged since the target was entered. They
    /// are kept in the log.
    pub messages_since: usize,
}

impl LossAssessment {
    /// Every key the rollback touches.
    pub fn affected_keys(&self) -> Vec<String> {
        self.lost_keys
            .iter()
            .chain(self.reverted_keys.iter())
            .cloned()
            .collect()
    }

    /// Returns true if no context would be discarded.
    pub fn is_lossless(&self) -> bool {
        self.lost_keys.is_empty() && self.reverted_keys.is_empty()
    }
}

/// A validated backtrack, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktrackPlan {
    pub assessment: LossAssessment,
    snapshot: SessionContext,
}

/// Most recent recorded linear state other than the current one.
pub fn default_target(session: &ConversationSession) -> Option<ConversationState> {
    target_entry(session, None).map(|entry| entry.state)
}

/// Plans a backtrack to `target`, or to the default target when `None`.
///
/// # Errors
///
/// - `InvalidStatusTransition` if the session is abandoned or completed
/// - `InvalidBacktrackTarget` if the target never appears in the history,
///   is not on the linear path, or no default target exists
pub fn plan(
    session: &ConversationSession,
    target: Option<ConversationState>,
) -> Result<BacktrackPlan, ConversationError> {
    if session.status().is_closed() {
        return Err(ConversationError::InvalidStatusTransition {
            from: session.status(),
            to: SessionStatus::Active,
        });
    }
    if let Some(state) = target {
        if !state.is_linear() || state.is_final() {
            return Err(ConversationError::InvalidBacktrackTarget(Some(state)));
        }
    }

    let entry = target_entry(session, target)
        .ok_or(ConversationError::InvalidBacktrackTarget(target))?;

    let diff = session.context().diff_since(&entry.context_snapshot);
    let messages_since = session
        .messages()
        .iter()
        .filter(|m| m.role().is_user_visible() && m.timestamp().is_after(&entry.timestamp))
        .count();

    Ok(BacktrackPlan {
        assessment: LossAssessment {
            from_state: session.current_state(),
            target_state: entry.state,
            target_entered_at: entry.timestamp,
            lost_keys: diff.added,
            reverted_keys: diff.changed,
            messages_since,
        },
        snapshot: entry.context_snapshot.clone(),
    })
}

/// Applies a plan: restores state and context, records the rollback and
/// clears any error.
pub fn execute(session: &mut ConversationSession, plan: BacktrackPlan) -> LossAssessment {
    let from = session.current_state();
    let target = plan.assessment.target_state;

    session.replace_context(plan.snapshot);
    session.clear_error();
    session.enter_state(target, HistoryEvent::Backtrack { from });

    info!(
        session_id = %session.id(),
        from = %from,
        to = %target,
        lost = plan.assessment.lost_keys.len(),
        "Backtracked"
    );
    plan.assessment
}

fn target_entry(
    session: &ConversationSession,
    target: Option<ConversationState>,
) -> Option<&StateHistoryEntry> {
    let current = session.current_state();
    match target {
        Some(state) => session.state_history().last_entry_for(state),
        None => session
            .state_history()
            .find_last(|entry| entry.state != current && entry.state.is_linear()),
    }
}
