//! SessionManager - The facade callers use to drive conversations.
//!
//! Each operation follows the same cycle: load the session, mutate it in
//! memory, persist it, respond. A failed operation persists nothing, so a
//! half-applied turn is never observable. Concurrent operations on the same
//! session are not coordinated; the last save wins.

use chrono::Duration;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::SessionStore;
use crate::domain::conversation::{
    keys, CheckpointSummary, ConversationError, ConversationSession, ConversationState,
    CourseFlowMachine, ExportOptions, IdleStatus, MessageMetadata, Role, SessionContext,
    SessionExport, SessionLimits, TransitionRecord, Trigger, DEFAULT_MAX_REFINEMENT_ITERATIONS,
};
use crate::domain::course::RequirementExtractor;
use crate::domain::flow::{FlowAction, FlowHandler, FlowKind, FlowSelection, LossAssessment};
use crate::domain::foundation::{SessionId, SessionStatus, Timestamp, UserId};
use crate::ports::SessionStorage;

/// Tunables for the manager. Built from `SessionsConfig` by the binary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionManagerConfig {
    /// Active or paused sessions an owner may hold at once.
    pub max_sessions_per_owner: usize,
    pub limits: SessionLimits,
    /// Inactivity after which the cleanup sweep removes a session.
    pub retention: Duration,
    pub idle_timeout: Duration,
    pub idle_warning: Duration,
    pub max_refinement_iterations: u32,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_owner: 5,
            limits: SessionLimits::default(),
            retention: Duration::days(30),
            idle_timeout: Duration::minutes(30),
            idle_warning: Duration::minutes(5),
            max_refinement_iterations: DEFAULT_MAX_REFINEMENT_ITERATIONS,
        }
    }
}

/// Result of creating or importing a session.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: ConversationSession,
    /// How the flow strategy was picked.
    pub flow: FlowSelection,
    /// Sessions abandoned to stay within the per-owner limit.
    pub evicted: Vec<SessionId>,
}

/// What the caller gets back after a turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session: ConversationSession,
    /// The transition the turn applied, if any.
    pub transition: Option<TransitionRecord>,
    pub available_actions: Vec<FlowAction>,
    /// Where the session's flow would go next.
    pub suggested_next: Option<ConversationState>,
}

/// Result of a confirmed backtrack.
#[derive(Debug, Clone)]
pub struct BacktrackOutcome {
    pub session: ConversationSession,
    pub loss: LossAssessment,
}

/// Result of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: Vec<SessionId>,
}

/// Orchestrates session lifecycle, turns and recovery.
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    flows: FlowHandler,
    extractor: RequirementExtractor,
    config: SessionManagerConfig,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionManagerConfig) -> Self {
        Self {
            store: SessionStore::new(storage, config.limits),
            flows: FlowHandler::new(CourseFlowMachine::new(config.max_refinement_iterations)),
            extractor: RequirementExtractor::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn flows(&self) -> &FlowHandler {
        &self.flows
    }

    // ───────────────────────────────────────────────────────────────────
    // Lifecycle
    // ───────────────────────────────────────────────────────────────────

    /// Starts a conversation in `Initial` for `owner`.
    ///
    /// Preferences are merged into the context (and kept whole under
    /// `preferences`). If the owner now holds more live sessions than
    /// allowed, the least recently active ones are abandoned and reported.
    pub async fn create_session(
        &self,
        owner: UserId,
        preferences: Map<String, Value>,
    ) -> Result<CreatedSession, ConversationError> {
        // 1. Pick the flow strategy
        let flow = self.flows.select_flow(&preferences);

        // 2. Seed the context
        let mut context = SessionContext::from(preferences.clone());
        if !preferences.is_empty() {
            context.set(keys::PREFERENCES, Value::Object(preferences));
        }

        // 3. Persist, making room within the owner's limit
        let session = ConversationSession::new(owner, flow.kind, context, self.config.limits);
        let evicted = self.persist_within_owner_limit(&session).await?;

        info!(
            session_id = %session.id(),
            owner_id = %session.owner_id(),
            flow = %flow.kind,
            evicted = evicted.len(),
            "Session created"
        );

        Ok(CreatedSession {
            session,
            flow,
            evicted,
        })
    }

    /// # Errors
    ///
    /// - `SessionNotFound` if absent or unreadable
    pub async fn load_session(&self, id: SessionId) -> Result<ConversationSession, ConversationError> {
        self.store.load(id).await
    }

    /// Persists the session as given. Idempotent; last writer wins.
    pub async fn save_session(&self, session: &ConversationSession) -> Result<(), ConversationError> {
        self.store.save(session).await
    }

    /// Marks the session paused. The conversation state is left alone.
    pub async fn pause_session(
        &self,
        id: SessionId,
        reason: Option<String>,
    ) -> Result<ConversationSession, ConversationError> {
        let mut session = self.store.load(id).await?;
        session.pause(reason)?;
        self.store.save(&session).await?;
        info!(session_id = %id, state = %session.current_state(), "Session paused");
        Ok(session)
    }

    /// Reactivates a paused session. A session parked in the `Paused`
    /// conversation state is returned to the state it held before.
    ///
    /// # Errors
    ///
    /// - `InvalidStatusTransition` if the session is abandoned, completed or
    ///   in error
    pub async fn resume_session(&self, id: SessionId) -> Result<ConversationSession, ConversationError> {
        let mut session = self.store.load(id).await?;
        if session.current_state() == ConversationState::Paused {
            self.flows.machine().apply(&mut session, Trigger::Resume)?;
        } else {
            session.resume()?;
        }
        self.store.save(&session).await?;
        info!(session_id = %id, state = %session.current_state(), "Session resumed");
        Ok(session)
    }

    /// Removes a session outright.
    pub async fn delete_session(&self, id: SessionId) -> Result<(), ConversationError> {
        if !self.store.delete(id).await? {
            return Err(ConversationError::SessionNotFound(id));
        }
        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// The owner's readable sessions, most recently active first.
    pub async fn list_sessions(&self, owner: &UserId) -> Result<Vec<ConversationSession>, ConversationError> {
        let mut sessions: Vec<ConversationSession> = self
            .store
            .records_for(owner)
            .await?
            .into_iter()
            .filter_map(|record| self.store.decode(record).ok())
            .collect();
        sessions.sort_by(|a, b| b.last_activity_at().cmp(&a.last_activity_at()));
        Ok(sessions)
    }

    /// Removes every session idle for longer than the retention window.
    /// Safe to run repeatedly.
    pub async fn cleanup_expired_sessions(&self) -> Result<CleanupReport, ConversationError> {
        let cutoff = Timestamp::now().minus(self.config.retention);
        let records = self.store.all_records().await?;
        let mut report = CleanupReport {
            scanned: records.len(),
            removed: Vec::new(),
        };

        for record in records {
            if record.last_activity_at.is_before(&cutoff) && self.store.delete(record.session_id).await? {
                debug!(session_id = %record.session_id, "Expired session removed");
                report.removed.push(record.session_id);
            }
        }

        info!(
            scanned = report.scanned,
            removed = report.removed.len(),
            "Session cleanup finished"
        );
        Ok(report)
    }

    // ───────────────────────────────────────────────────────────────────
    // Turns
    // ───────────────────────────────────────────────────────────────────

    /// Handles one user message: records it, pulls requirements out of the
    /// text, then applies `trigger` if given. If the trigger is refused the
    /// whole turn is discarded and the error returned.
    pub async fn handle_message(
        &self,
        id: SessionId,
        content: &str,
        trigger: Option<Trigger>,
    ) -> Result<TurnOutcome, ConversationError> {
        let mut session = self.store.load(id).await?;
        if session.status().is_closed() {
            return Err(ConversationError::InvalidStatusTransition {
                from: session.status(),
                to: SessionStatus::Active,
            });
        }

        // 1. Record the message
        session.add_message(Role::User, content, MessageMetadata::default())?;

        // 2. Extract requirements
        let extracted = self.extractor.extract(content);
        if !extracted.is_empty() {
            let merged = extracted.merged_into(session.context().get_object(keys::REQUIREMENTS));
            session.set_context(keys::REQUIREMENTS, Value::Object(merged));
            if let Some(topic) = &extracted.topic {
                session.set_context(keys::TOPIC, Value::from(topic.as_str()));
            }
            debug!(
                session_id = %id,
                confidence = session.confidence().value(),
                "Requirements extracted from message"
            );
        }

        // 3. Transition
        let transition = match trigger {
            Some(trigger) => Some(self.flows.machine().apply(&mut session, trigger)?),
            None => None,
        };

        // 4. Persist
        self.store.save(&session).await?;
        Ok(self.outcome(session, transition))
    }

    /// Applies a trigger without a message.
    pub async fn apply_trigger(
        &self,
        id: SessionId,
        trigger: Trigger,
    ) -> Result<TurnOutcome, ConversationError> {
        let mut session = self.store.load(id).await?;
        let transition = self.flows.machine().apply(&mut session, trigger)?;
        self.store.save(&session).await?;
        Ok(self.outcome(session, Some(transition)))
    }

    /// Current action menu, without changing anything.
    pub async fn describe_session(&self, id: SessionId) -> Result<TurnOutcome, ConversationError> {
        let session = self.store.load(id).await?;
        Ok(self.outcome(session, None))
    }

    /// Switches the flow strategy mid-session.
    pub async fn set_flow_strategy(
        &self,
        id: SessionId,
        kind: FlowKind,
    ) -> Result<TurnOutcome, ConversationError> {
        let mut session = self.store.load(id).await?;
        let previous = session.flow();
        session.set_flow(kind);
        self.store.save(&session).await?;
        info!(session_id = %id, from = %previous, to = %kind, "Flow strategy changed");
        Ok(self.outcome(session, None))
    }

    // ───────────────────────────────────────────────────────────────────
    // Recovery
    // ───────────────────────────────────────────────────────────────────

    /// Reports what backtracking to `target` would discard. Nothing changes.
    pub async fn preview_backtrack(
        &self,
        id: SessionId,
        target: Option<ConversationState>,
    ) -> Result<LossAssessment, ConversationError> {
        let session = self.store.load(id).await?;
        self.flows.preview_backtrack(&session, target)
    }

    /// Backtracks to `target` (or the most recent other state). Calling this
    /// is the caller's confirmation of the previewed loss.
    pub async fn backtrack(
        &self,
        id: SessionId,
        target: Option<ConversationState>,
    ) -> Result<BacktrackOutcome, ConversationError> {
        let mut session = self.store.load(id).await?;
        let loss = self.flows.backtrack(&mut session, target)?;
        self.store.save(&session).await?;
        Ok(BacktrackOutcome { session, loss })
    }

    pub async fn create_checkpoint(
        &self,
        id: SessionId,
        label: &str,
    ) -> Result<CheckpointSummary, ConversationError> {
        let mut session = self.store.load(id).await?;
        session.create_checkpoint(label)?;
        let summary = session
            .checkpoint(label)
            .map(CheckpointSummary::from)
            .ok_or_else(|| ConversationError::CheckpointNotFound(label.to_string()))?;
        self.store.save(&session).await?;
        info!(session_id = %id, label = %label, "Checkpoint created");
        Ok(summary)
    }

    pub async fn restore_checkpoint(
        &self,
        id: SessionId,
        label: &str,
    ) -> Result<ConversationSession, ConversationError> {
        let mut session = self.store.load(id).await?;
        session.restore_checkpoint(label)?;
        self.store.save(&session).await?;
        info!(session_id = %id, label = %label, state = %session.current_state(), "Checkpoint restored");
        Ok(session)
    }

    pub async fn list_checkpoints(&self, id: SessionId) -> Result<Vec<CheckpointSummary>, ConversationError> {
        Ok(self.store.load(id).await?.checkpoints())
    }

    // ───────────────────────────────────────────────────────────────────
    // Idle timeout
    // ───────────────────────────────────────────────────────────────────

    pub async fn idle_status(&self, id: SessionId) -> Result<IdleStatus, ConversationError> {
        let session = self.store.load(id).await?;
        Ok(session.idle_status(
            Timestamp::now(),
            self.config.idle_timeout,
            self.config.idle_warning,
        ))
    }

    /// Records activity so the idle clock restarts.
    pub async fn extend_session(&self, id: SessionId) -> Result<IdleStatus, ConversationError> {
        let mut session = self.store.load(id).await?;
        session.touch();
        self.store.save(&session).await?;
        debug!(session_id = %id, "Session extended");
        Ok(session.idle_status(
            Timestamp::now(),
            self.config.idle_timeout,
            self.config.idle_warning,
        ))
    }

    // ───────────────────────────────────────────────────────────────────
    // Export / import
    // ───────────────────────────────────────────────────────────────────

    pub async fn export_session(
        &self,
        id: SessionId,
        options: &ExportOptions,
    ) -> Result<SessionExport, ConversationError> {
        let session = self.store.load(id).await?;
        let export = SessionExport::pack(&session, options)?;
        info!(session_id = %id, compressed = options.compress, "Session exported");
        Ok(export)
    }

    /// Imports an export as a brand-new session with its own id.
    ///
    /// # Errors
    ///
    /// - `InvalidImportFormat` for unknown versions, bad payloads or a
    ///   history that is out of order
    ///
    /// A history that was left out of the export, or that does not end in
    /// the session's current state, gets an `Imported` entry for it.
    pub async fn import_session(&self, export: SessionExport) -> Result<CreatedSession, ConversationError> {
        let source = export.source_session_id;
        let mut session = export.unpack()?;
        if !session.state_history().is_ordered() {
            return Err(ConversationError::import("state history is out of order"));
        }

        session.reassign_identity(SessionId::new());
        session.apply_limits(self.config.limits);
        session.anchor_history();
        let evicted = self.persist_within_owner_limit(&session).await?;

        info!(
            session_id = %session.id(),
            source_session_id = ?source,
            owner_id = %session.owner_id(),
            "Session imported"
        );

        let flow = FlowSelection {
            kind: session.flow(),
            assessment: None,
        };
        Ok(CreatedSession {
            session,
            flow,
            evicted,
        })
    }

    /// Parses export JSON and imports it.
    pub async fn import_session_json(&self, json: &str) -> Result<CreatedSession, ConversationError> {
        self.import_session(SessionExport::from_json(json)?).await
    }

    /// Sharing sessions between owners is not offered.
    pub async fn share_session(
        &self,
        _id: SessionId,
        _with: &UserId,
    ) -> Result<(), ConversationError> {
        Err(ConversationError::Unsupported("session sharing"))
    }

    // ───────────────────────────────────────────────────────────────────
    // Internals
    // ───────────────────────────────────────────────────────────────────

    fn outcome(
        &self,
        session: ConversationSession,
        transition: Option<TransitionRecord>,
    ) -> TurnOutcome {
        let available_actions = self.flows.available_actions(&session);
        let suggested_next = self.flows.next_state(&session);
        TurnOutcome {
            session,
            transition,
            available_actions,
            suggested_next,
        }
    }

    /// Saves a new session and abandons the owner's least recently active
    /// live sessions until the owner is back within the limit.
    ///
    /// Victims are chosen before anything is written. If a write fails
    /// part way, the new session is removed and victims already abandoned
    /// are put back, so the caller sees either the whole change or none.
    async fn persist_within_owner_limit(
        &self,
        session: &ConversationSession,
    ) -> Result<Vec<SessionId>, ConversationError> {
        let victims = self.eviction_victims(session).await?;
        self.store.save(session).await?;

        let mut evicted: Vec<ConversationSession> = Vec::new();
        for original in victims {
            let mut victim = original.clone();
            let written = match victim.abandon() {
                Ok(()) => self.store.save(&victim).await,
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                self.roll_back_creation(session.id(), &evicted).await;
                return Err(err);
            }
            info!(session_id = %victim.id(), owner_id = %victim.owner_id(), "Session evicted");
            evicted.push(original);
        }
        Ok(evicted.iter().map(ConversationSession::id).collect())
    }

    /// Live sessions to abandon so that `keep` fits in its owner's limit,
    /// least recently active first. Unreadable sessions are skipped.
    async fn eviction_victims(
        &self,
        keep: &ConversationSession,
    ) -> Result<Vec<ConversationSession>, ConversationError> {
        if !keep.status().is_live() {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<_> = self
            .store
            .records_for(keep.owner_id())
            .await?
            .into_iter()
            .filter(|r| r.status.is_live() && r.session_id != keep.id())
            .collect();
        let live = candidates.len() + 1;
        let excess = live.saturating_sub(self.config.max_sessions_per_owner);
        if excess == 0 {
            return Ok(Vec::new());
        }

        candidates.sort_by_key(|r| r.last_activity_at);
        let victims = candidates
            .into_iter()
            .filter_map(|record| {
                let id = record.session_id;
                match self.store.decode(record) {
                    Ok(victim) => Some(victim),
                    Err(_) => {
                        warn!(session_id = %id, "Cannot evict unreadable session");
                        None
                    }
                }
            })
            .take(excess)
            .collect();
        Ok(victims)
    }

    /// Best-effort undo of a half-finished create or import.
    async fn roll_back_creation(&self, created: SessionId, evicted: &[ConversationSession]) {
        if let Err(err) = self.store.delete(created).await {
            error!(session_id = %created, error = %err, "Cannot remove session after failed eviction");
        }
        for original in evicted {
            if let Err(err) = self.store.save(original).await {
                error!(session_id = %original.id(), error = %err, "Cannot restore evicted session");
            }
        }
        warn!(session_id = %created, "Session creation rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemorySessionStorage;
    use serde_json::json;

    fn owner() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn manager() -> (SessionManager, InMemorySessionStorage) {
        let storage = InMemorySessionStorage::new();
        let manager = SessionManager::new(Arc::new(storage.clone()), SessionManagerConfig::default());
        (manager, storage)
    }

    fn prefs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn create_starts_in_initial_and_persists() {
            let (manager, storage) = manager();
            let created = manager.create_session(owner(), Map::new()).await.unwrap();

            assert_eq!(created.session.current_state(), ConversationState::Initial);
            assert_eq!(created.session.status(), SessionStatus::Active);
            assert!(created.evicted.is_empty());
            assert_eq!(storage.record_count().await, 1);
        }

        #[tokio::test]
        async fn preferences_pick_the_flow_and_seed_context() {
            let (manager, _) = manager();
            let created = manager
                .create_session(owner(), prefs(json!({"user_preference": "expert", "topic": "Go"})))
                .await
                .unwrap();

            assert_eq!(created.session.flow(), FlowKind::Expert);
            assert_eq!(created.session.context().get_str("topic"), Some("Go"));
            assert!(created.session.context().has(keys::PREFERENCES));
        }

        #[tokio::test]
        async fn pause_keeps_state_and_resume_reactivates() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            manager.apply_trigger(id, Trigger::Begin).await.unwrap();

            let paused = manager.pause_session(id, Some("lunch".into())).await.unwrap();
            assert_eq!(paused.status(), SessionStatus::Paused);
            assert_eq!(paused.current_state(), ConversationState::Welcome);
            assert_eq!(paused.pause_reason(), Some("lunch"));

            let resumed = manager.resume_session(id).await.unwrap();
            assert_eq!(resumed.status(), SessionStatus::Active);
            assert_eq!(resumed.current_state(), ConversationState::Welcome);
        }

        #[tokio::test]
        async fn resume_returns_from_paused_state() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            manager.apply_trigger(id, Trigger::Begin).await.unwrap();
            manager.apply_trigger(id, Trigger::Pause).await.unwrap();

            let resumed = manager.resume_session(id).await.unwrap();
            assert_eq!(resumed.current_state(), ConversationState::Welcome);
            assert_eq!(resumed.status(), SessionStatus::Active);
        }

        #[tokio::test]
        async fn resume_of_abandoned_session_fails() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            manager.apply_trigger(id, Trigger::Abandon).await.unwrap();

            let err = manager.resume_session(id).await.unwrap_err();
            assert!(matches!(err, ConversationError::InvalidStatusTransition { .. }));
        }

        #[tokio::test]
        async fn delete_then_load_is_not_found() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();

            manager.delete_session(id).await.unwrap();
            assert_eq!(
                manager.load_session(id).await.unwrap_err(),
                ConversationError::SessionNotFound(id)
            );
            assert_eq!(
                manager.delete_session(id).await.unwrap_err(),
                ConversationError::SessionNotFound(id)
            );
        }

        #[tokio::test]
        async fn list_is_most_recently_active_first() {
            let (manager, _) = manager();
            let first = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            let second = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            manager.extend_session(first).await.unwrap();

            let ids: Vec<SessionId> = manager
                .list_sessions(&owner())
                .await
                .unwrap()
                .iter()
                .map(|s| s.id())
                .collect();
            assert_eq!(ids, vec![first, second]);
        }

        #[tokio::test]
        async fn storage_outage_is_surfaced() {
            let (manager, storage) = manager();
            storage.set_unavailable(true);
            let err = manager.create_session(owner(), Map::new()).await.unwrap_err();
            assert!(matches!(err, ConversationError::StorageFailure(_)));
        }

        #[tokio::test]
        async fn failed_eviction_leaves_no_trace_of_the_new_session() {
            let (manager, storage) = manager();
            let mut ids = Vec::new();
            for _ in 0..5 {
                ids.push(manager.create_session(owner(), Map::new()).await.unwrap().session.id());
            }

            // The new session is written, then abandoning the oldest fails.
            storage.fail_writes_after(1);
            let err = manager.create_session(owner(), Map::new()).await.unwrap_err();
            assert!(matches!(err, ConversationError::StorageFailure(_)));

            storage.allow_all_writes();
            assert_eq!(storage.record_count().await, 5);
            for id in ids {
                let stored = manager.load_session(id).await.unwrap();
                assert_eq!(stored.status(), SessionStatus::Active);
            }
        }

        #[tokio::test]
        async fn listing_failure_writes_nothing() {
            let (manager, storage) = manager();
            for _ in 0..5 {
                manager.create_session(owner(), Map::new()).await.unwrap();
            }

            storage.set_unavailable(true);
            assert!(manager.create_session(owner(), Map::new()).await.is_err());
            storage.set_unavailable(false);
            assert_eq!(storage.record_count().await, 5);
        }

        #[tokio::test]
        async fn sharing_is_unsupported() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            let err = manager
                .share_session(id, &UserId::new("u2").unwrap())
                .await
                .unwrap_err();
            assert_eq!(err, ConversationError::Unsupported("session sharing"));
        }
    }

    mod turns {
        use super::*;

        #[tokio::test]
        async fn message_extracts_requirements() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();

            let outcome = manager
                .handle_message(id, "I want a Python course for beginners", Some(Trigger::DescribeCourse))
                .await
                .unwrap();

            let session = &outcome.session;
            assert_eq!(session.current_state(), ConversationState::RequirementsGathering);
            assert_eq!(session.context().get_str(keys::TOPIC), Some("Python"));
            let requirements = session.context().get_object(keys::REQUIREMENTS).unwrap();
            assert_eq!(requirements["target_audience"], json!("beginners"));
            assert!(outcome.transition.is_some());
            assert!(!outcome.available_actions.is_empty());
        }

        #[tokio::test]
        async fn refused_trigger_discards_the_whole_turn() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();

            let err = manager
                .handle_message(id, "a Rust course", Some(Trigger::ContentReady))
                .await
                .unwrap_err();
            assert!(matches!(err, ConversationError::InvalidTransition { .. }));

            let stored = manager.load_session(id).await.unwrap();
            assert!(stored.messages().is_empty());
            assert!(!stored.context().has(keys::TOPIC));
        }

        #[tokio::test]
        async fn blank_message_is_a_validation_error() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            let err = manager.handle_message(id, "   ", None).await.unwrap_err();
            assert!(matches!(err, ConversationError::Validation(_)));
        }

        #[tokio::test]
        async fn flow_strategy_can_change() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            let outcome = manager.set_flow_strategy(id, FlowKind::Linear).await.unwrap();
            assert_eq!(outcome.session.flow(), FlowKind::Linear);
            assert_eq!(manager.load_session(id).await.unwrap().flow(), FlowKind::Linear);
        }
    }

    mod recovery {
        use super::*;

        #[tokio::test]
        async fn checkpoints_round_trip_through_the_store() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            manager.apply_trigger(id, Trigger::Begin).await.unwrap();

            let summary = manager.create_checkpoint(id, "welcome").await.unwrap();
            assert_eq!(summary.state, ConversationState::Welcome);

            manager.apply_trigger(id, Trigger::DescribeCourse).await.unwrap();
            let restored = manager.restore_checkpoint(id, "welcome").await.unwrap();
            assert_eq!(restored.current_state(), ConversationState::Welcome);
            assert_eq!(manager.list_checkpoints(id).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn unknown_checkpoint_is_reported() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            let err = manager.restore_checkpoint(id, "nope").await.unwrap_err();
            assert_eq!(err, ConversationError::CheckpointNotFound("nope".to_string()));
        }

        #[tokio::test]
        async fn preview_does_not_mutate() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            manager.apply_trigger(id, Trigger::Begin).await.unwrap();
            let before = manager.load_session(id).await.unwrap();

            let loss = manager.preview_backtrack(id, None).await.unwrap();
            assert_eq!(loss.target_state, ConversationState::Initial);
            assert_eq!(manager.load_session(id).await.unwrap(), before);
        }
    }

    mod idle {
        use super::*;

        #[tokio::test]
        async fn fresh_session_is_active() {
            let (manager, _) = manager();
            let id = manager.create_session(owner(), Map::new()).await.unwrap().session.id();
            assert_eq!(manager.idle_status(id).await.unwrap(), IdleStatus::Active);
        }

        #[tokio::test]
        async fn extend_restarts_the_idle_clock() {
            let (manager, _) = manager();
            let mut session = manager.create_session(owner(), Map::new()).await.unwrap().session;
            session.set_last_activity_at(Timestamp::now().minus_minutes(28));
            manager.save_session(&session).await.unwrap();

            assert!(matches!(
                manager.idle_status(session.id()).await.unwrap(),
                IdleStatus::Warning { .. }
            ));
            assert_eq!(manager.extend_session(session.id()).await.unwrap(), IdleStatus::Active);
        }
    }

    mod cleanup {
        use super::*;

        #[tokio::test]
        async fn removes_only_expired_sessions_and_is_idempotent() {
            let (manager, storage) = manager();
            let fresh = manager.create_session(owner(), Map::new()).await.unwrap().session;
            let mut stale = manager.create_session(owner(), Map::new()).await.unwrap().session;
            stale.set_last_activity_at(Timestamp::now().minus_days(31));
            manager.save_session(&stale).await.unwrap();

            let report = manager.cleanup_expired_sessions().await.unwrap();
            assert_eq!(report.scanned, 2);
            assert_eq!(report.removed, vec![stale.id()]);
            assert_eq!(storage.record_count().await, 1);
            assert!(manager.load_session(fresh.id()).await.is_ok());

            let again = manager.cleanup_expired_sessions().await.unwrap();
            assert!(again.removed.is_empty());
        }
    }
}
