//! ConversationSession aggregate.
//!
//! One end-to-end conversation: its message log, current state, context
//! bag, derived progress metrics, state history and checkpoints.
//!
//! # Invariants
//!
//! - `id` is assigned at creation and only replaced when importing a copy
//! - `current_state` changes only through [`CourseFlowMachine`] or a
//!   recorded rollback (backtrack, checkpoint restore)
//! - `progress` and `confidence` are recomputed from state and context on
//!   every mutation and cannot be set directly
//! - `updated_at` moves on content changes, `last_activity_at` on any
//!   interaction
//!
//! [`CourseFlowMachine`]: super::CourseFlowMachine

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::checkpoint::{Checkpoint, CheckpointSummary, SessionSnapshot};
use super::history::{HistoryEvent, StateHistory};
use super::message::{Message, MessageMetadata, Role};
use super::progress;
use super::{ConversationError, ConversationState, SessionContext, Trigger};
use crate::domain::flow::FlowKind;
use crate::domain::foundation::{
    Confidence, MessageId, Percentage, SessionId, SessionStatus, StateMachine, Timestamp,
    UserId, ValidationError,
};

/// Size bounds applied to a session's logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_messages: usize,
    pub max_state_history: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_messages: 100,
            max_state_history: 50,
        }
    }
}

/// Where a session stands relative to the idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStatus {
    Active,
    /// Inside the warning window; the caller may offer an extension.
    Warning { remaining_secs: i64 },
    TimedOut,
}

/// A course-creation conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    id: SessionId,
    owner_id: UserId,
    current_state: ConversationState,
    status: SessionStatus,
    state_history: StateHistory,
    messages: Vec<Message>,
    context: SessionContext,
    progress: Percentage,
    confidence: Confidence,
    flow: FlowKind,
    #[serde(default)]
    refinement_counts: BTreeMap<ConversationState, u32>,
    #[serde(default)]
    checkpoints: BTreeMap<String, Checkpoint>,
    #[serde(default)]
    last_error: Option<String>,
    #[serde(default)]
    pause_reason: Option<String>,
    /// State to return to when leaving the `Paused` conversation state.
    #[serde(default)]
    resume_state: Option<ConversationState>,
    created_at: Timestamp,
    updated_at: Timestamp,
    last_activity_at: Timestamp,
    #[serde(skip)]
    limits: SessionLimits,
}

impl ConversationSession {
    /// Creates a session in `Initial` with the given context already merged.
    pub fn new(
        owner_id: UserId,
        flow: FlowKind,
        initial_context: SessionContext,
        limits: SessionLimits,
    ) -> Self {
        let now = Timestamp::now();
        let mut session = Self {
            id: SessionId::new(),
            owner_id,
            current_state: ConversationState::Initial,
            status: SessionStatus::Active,
            state_history: StateHistory::new(),
            messages: Vec::new(),
            context: initial_context,
            progress: Percentage::ZERO,
            confidence: Confidence::NONE,
            flow,
            refinement_counts: BTreeMap::new(),
            checkpoints: BTreeMap::new(),
            last_error: None,
            pause_reason: None,
            resume_state: None,
            created_at: now,
            updated_at: now,
            last_activity_at: now,
            limits,
        };
        session.state_history.push(
            ConversationState::Initial,
            session.context.clone(),
            HistoryEvent::Created,
            limits.max_state_history,
        );
        session.recompute_metrics();
        session
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn current_state(&self) -> ConversationState {
        self.current_state
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn state_history(&self) -> &StateHistory {
        &self.state_history
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn progress(&self) -> Percentage {
        self.progress
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pause_reason(&self) -> Option<&str> {
        self.pause_reason.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn last_activity_at(&self) -> Timestamp {
        self.last_activity_at
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// State a `Resume` trigger returns to while parked in `Paused`.
    pub fn state_before_pause(&self) -> Option<ConversationState> {
        self.resume_state
            .or_else(|| self.state_history.state_before_pause())
    }

    /// How many times `state` has been entered; only tracked for refinement
    /// states.
    pub fn refinement_count(&self, state: ConversationState) -> u32 {
        self.refinement_counts.get(&state).copied().unwrap_or(0)
    }

    /// Number of messages sent by the user.
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_from_user()).count()
    }

    // ───────────────────────────────────────────────────────────────
    // Messages and context
    // ───────────────────────────────────────────────────────────────

    /// Appends a message, trimming the oldest unpinned messages if the log
    /// grows past its bound.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if content is blank
    pub fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        mut metadata: MessageMetadata,
    ) -> Result<MessageId, ValidationError> {
        if metadata.state.is_none() {
            metadata.state = Some(self.current_state);
        }
        let message = Message::new(role, content, metadata)?;
        let id = message.id();
        self.messages.push(message);
        self.trim_messages();
        self.mark_updated();
        Ok(id)
    }

    /// Sets one context key; `null` deletes it.
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.set(key, value);
        self.recompute_metrics();
        self.mark_updated();
    }

    /// Shallow-merges `partial` into the context.
    pub fn merge_context(&mut self, partial: Map<String, Value>) -> Vec<String> {
        let touched = self.context.merge(partial);
        self.recompute_metrics();
        self.mark_updated();
        touched
    }

    /// Records an interaction that does not change content.
    pub fn touch(&mut self) {
        self.last_activity_at = Timestamp::now();
    }

    // ───────────────────────────────────────────────────────────────
    // Status
    // ───────────────────────────────────────────────────────────────

    /// Marks the session paused without moving the conversation.
    ///
    /// # Errors
    ///
    /// - `InvalidStatusTransition` unless the session is active or paused
    pub fn pause(&mut self, reason: Option<String>) -> Result<(), ConversationError> {
        match self.status {
            SessionStatus::Paused => {}
            SessionStatus::Active => self.change_status(SessionStatus::Paused)?,
            other => {
                return Err(ConversationError::InvalidStatusTransition {
                    from: other,
                    to: SessionStatus::Paused,
                })
            }
        }
        self.pause_reason = reason;
        self.mark_updated();
        Ok(())
    }

    /// Marks a paused session active again. Resuming an active session is a
    /// no-op apart from recording activity.
    ///
    /// # Errors
    ///
    /// - `InvalidStatusTransition` if the session is abandoned, completed
    ///   or in error
    pub fn resume(&mut self) -> Result<(), ConversationError> {
        match self.status {
            SessionStatus::Active => self.touch(),
            SessionStatus::Paused => {
                self.change_status(SessionStatus::Active)?;
                self.pause_reason = None;
                self.mark_updated();
            }
            other => {
                return Err(ConversationError::InvalidStatusTransition {
                    from: other,
                    to: SessionStatus::Active,
                })
            }
        }
        Ok(())
    }

    /// Takes the session out of circulation without touching its state or
    /// content. Used for per-owner eviction, so it is not owner activity and
    /// leaves `last_activity_at` alone.
    pub fn abandon(&mut self) -> Result<(), ConversationError> {
        if self.status == SessionStatus::Abandoned {
            return Ok(());
        }
        self.change_status(SessionStatus::Abandoned)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Switches the flow strategy.
    pub fn set_flow(&mut self, flow: FlowKind) {
        if self.flow != flow {
            self.flow = flow;
            self.mark_updated();
        } else {
            self.touch();
        }
    }

    /// Compares idle time against `timeout`, warning once less than
    /// `warning` remains.
    pub fn idle_status(&self, now: Timestamp, timeout: Duration, warning: Duration) -> IdleStatus {
        let idle = now.duration_since(&self.last_activity_at);
        if idle >= timeout {
            return IdleStatus::TimedOut;
        }
        let remaining = timeout - idle;
        if remaining <= warning {
            IdleStatus::Warning {
                remaining_secs: remaining.num_seconds(),
            }
        } else {
            IdleStatus::Active
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Checkpoints
    // ───────────────────────────────────────────────────────────────

    /// Saves the full session under `label`, replacing any checkpoint with
    /// the same label.
    pub fn create_checkpoint(&mut self, label: impl Into<String>) -> Result<(), ConversationError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ValidationError::empty_field("label").into());
        }
        let checkpoint = Checkpoint {
            label: label.clone(),
            created_at: Timestamp::now(),
            snapshot: self.snapshot(),
        };
        self.checkpoints.insert(label, checkpoint);
        self.mark_updated();
        Ok(())
    }

    /// Restores the snapshot saved under `label` and records the restore in
    /// the state history. History recorded since the checkpoint is kept, and
    /// refinement rounds already used stay used.
    ///
    /// # Errors
    ///
    /// - `CheckpointNotFound` if no checkpoint has that label
    /// - `InvalidStatusTransition` if the session is closed
    pub fn restore_checkpoint(&mut self, label: &str) -> Result<(), ConversationError> {
        let snapshot = self
            .checkpoints
            .get(label)
            .map(|c| c.snapshot.clone())
            .ok_or_else(|| ConversationError::CheckpointNotFound(label.to_string()))?;

        if self.status.is_closed() {
            return Err(ConversationError::InvalidStatusTransition {
                from: self.status,
                to: snapshot.status,
            });
        }

        self.current_state = snapshot.current_state;
        self.status = snapshot.status;
        self.resume_state = snapshot.resume_state;
        self.messages = snapshot.messages;
        self.context = snapshot.context;
        self.flow = snapshot.flow;
        self.last_error = snapshot.last_error;
        self.pause_reason = snapshot.pause_reason;

        self.state_history.push(
            self.current_state,
            self.context.clone(),
            HistoryEvent::CheckpointRestored {
                label: label.to_string(),
            },
            self.limits.max_state_history,
        );
        self.recompute_metrics();
        self.mark_updated();
        Ok(())
    }

    pub fn checkpoint(&self, label: &str) -> Option<&Checkpoint> {
        self.checkpoints.get(label)
    }

    /// Checkpoints, oldest first.
    pub fn checkpoints(&self) -> Vec<CheckpointSummary> {
        let mut summaries: Vec<CheckpointSummary> =
            self.checkpoints.values().map(CheckpointSummary::from).collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    // ───────────────────────────────────────────────────────────────
    // Crate-internal mutation used by the machine, flow and manager
    // ───────────────────────────────────────────────────────────────

    /// Enters `state`: records history, pins a marker message, syncs the
    /// status and refreshes metrics.
    pub(crate) fn enter_state(&mut self, state: ConversationState, event: HistoryEvent) {
        let from = self.current_state;
        self.current_state = state;
        self.state_history.push(
            state,
            self.context.clone(),
            event.clone(),
            self.limits.max_state_history,
        );

        // Only a forward transition is a new refinement round
        let counts_as_round = matches!(
            &event,
            HistoryEvent::Transition { trigger, .. } if *trigger != Trigger::Resume
        );
        if state.is_refinement() && counts_as_round {
            *self.refinement_counts.entry(state).or_insert(0) += 1;
        }

        self.resume_state = match (&event, state) {
            (HistoryEvent::Transition { from, .. }, ConversationState::Paused) => Some(*from),
            (_, ConversationState::Paused) => self.resume_state,
            _ => None,
        };

        self.status = match (state, &event) {
            (ConversationState::Error, _) => SessionStatus::Error,
            (ConversationState::Completed, _) => SessionStatus::Completed,
            (ConversationState::Abandoned, _) => SessionStatus::Abandoned,
            (ConversationState::Paused, _) => SessionStatus::Paused,
            (_, HistoryEvent::Backtrack { .. }) => SessionStatus::Active,
            (_, _) if from == ConversationState::Paused => SessionStatus::Active,
            _ => self.status,
        };
        if self.status == SessionStatus::Active {
            self.pause_reason = None;
        }

        let marker = match &event {
            HistoryEvent::Backtrack { from } => {
                format!("Went back from {} to {}", from.label(), state.label())
            }
            _ => format!("Moved to: {}", state.label()),
        };
        let mut metadata = MessageMetadata::in_state(state).pinned();
        if let HistoryEvent::Transition { trigger, .. } = &event {
            metadata = metadata.with_trigger(*trigger);
        }
        if let Ok(message) = Message::new(Role::System, marker, metadata) {
            self.messages.push(message);
        }
        self.trim_messages();

        self.recompute_metrics();
        self.mark_updated();
    }

    pub(crate) fn record_error(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Replaces the context wholesale; used when rolling back.
    pub(crate) fn replace_context(&mut self, context: SessionContext) {
        self.context = context;
        self.recompute_metrics();
    }

    /// Applies size bounds, trimming the logs if they already exceed them.
    pub(crate) fn apply_limits(&mut self, limits: SessionLimits) {
        self.limits = limits;
        self.trim_messages();
        self.state_history.truncate_to(limits.max_state_history);
    }

    /// Gives an imported copy its own identity and a fresh activity clock.
    pub(crate) fn reassign_identity(&mut self, id: SessionId) {
        let now = Timestamp::now();
        self.id = id;
        self.status = status_for_state(self.current_state);
        self.updated_at = now;
        self.last_activity_at = now;
        self.recompute_metrics();
    }

    pub(crate) fn strip_history(&mut self) {
        self.state_history.clear();
    }

    /// Makes sure the history ends in the current state, recording an
    /// `Imported` entry when it is empty or ends elsewhere.
    pub(crate) fn anchor_history(&mut self) {
        let anchored = self
            .state_history
            .last()
            .is_some_and(|entry| entry.state == self.current_state);
        if !anchored {
            self.state_history.push(
                self.current_state,
                self.context.clone(),
                HistoryEvent::Imported,
                self.limits.max_state_history,
            );
        }
    }

    pub(crate) fn strip_checkpoints(&mut self) {
        self.checkpoints.clear();
    }

    pub(crate) fn strip_message_metadata(&mut self) {
        for message in &mut self.messages {
            message.strip_extra_metadata();
        }
    }

    /// Backdates activity; only used to simulate elapsed time.
    #[cfg(test)]
    pub(crate) fn set_last_activity_at(&mut self, at: Timestamp) {
        self.last_activity_at = at;
    }

    // ───────────────────────────────────────────────────────────────
    // Internals
    // ───────────────────────────────────────────────────────────────

    fn change_status(&mut self, to: SessionStatus) -> Result<(), ConversationError> {
        let from = self.status;
        self.status = from
            .transition_to(to)
            .map_err(|_| ConversationError::InvalidStatusTransition { from, to })?;
        Ok(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_state: self.current_state,
            status: self.status,
            resume_state: self.resume_state,
            messages: self.messages.clone(),
            context: self.context.clone(),
            flow: self.flow,
            last_error: self.last_error.clone(),
            pause_reason: self.pause_reason.clone(),
        }
    }

    fn trim_messages(&mut self) {
        let max = self.limits.max_messages.max(1);
        let mut excess = self.messages.len().saturating_sub(max);
        if excess == 0 {
            return;
        }
        self.messages.retain(|message| {
            if excess > 0 && !message.is_pinned() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    fn recompute_metrics(&mut self) {
        self.progress = progress::progress(self.current_state, &self.context);
        self.confidence = progress::confidence(&self.context);
    }

    fn mark_updated(&mut self) {
        let now = Timestamp::now();
        self.updated_at = now;
        self.last_activity_at = now;
    }
}

/// Session status implied by a conversation state.
pub fn status_for_state(state: ConversationState) -> SessionStatus {
    match state {
        ConversationState::Completed => SessionStatus::Completed,
        ConversationState::Abandoned => SessionStatus::Abandoned,
        ConversationState::Error => SessionStatus::Error,
        ConversationState::Paused => SessionStatus::Paused,
        _ => SessionStatus::Active,
    }
}
