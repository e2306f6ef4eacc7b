//! Append-only state history used for backtracking.

use serde::{Deserialize, Serialize};

use super::{ConversationState, SessionContext, Trigger};
use crate::domain::foundation::Timestamp;

/// What caused a history entry to be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// The session was created in this state.
    Created,
    /// A validated transition entered this state.
    Transition {
        from: ConversationState,
        trigger: Trigger,
    },
    /// The session was rolled back to this state.
    Backtrack { from: ConversationState },
    /// A named checkpoint was restored.
    CheckpointRestored { label: String },
    /// The session was imported without a history ending in this state.
    Imported,
}

/// One recorded entry: the state entered and the context at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub state: ConversationState,
    pub context_snapshot: SessionContext,
    pub timestamp: Timestamp,
    pub event: HistoryEvent,
}

/// Bounded, append-only sequence of [`StateHistoryEntry`].
///
/// # Invariants
///
/// - timestamps are strictly increasing
/// - entries are never mutated or reordered after append
/// - once the bound is exceeded the oldest entries are evicted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateHistory(Vec<StateHistoryEntry>);

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, bumping its timestamp past the previous one if the
    /// clock has not moved, then evicts down to `max_entries`.
    pub fn push(
        &mut self,
        state: ConversationState,
        context_snapshot: SessionContext,
        event: HistoryEvent,
        max_entries: usize,
    ) -> Timestamp {
        let now = Timestamp::now();
        let timestamp = match self.0.last() {
            Some(last) => now.strictly_after(&last.timestamp),
            None => now,
        };
        self.0.push(StateHistoryEntry {
            state,
            context_snapshot,
            timestamp,
            event,
        });
        self.truncate_to(max_entries);
        timestamp
    }

    /// Evicts the oldest entries until at most `max_entries` remain.
    pub fn truncate_to(&mut self, max_entries: usize) {
        let max_entries = max_entries.max(1);
        if self.0.len() > max_entries {
            let excess = self.0.len() - max_entries;
            self.0.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[StateHistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&StateHistoryEntry> {
        self.0.last()
    }

    /// Most recent entry satisfying `predicate`.
    pub fn find_last<P>(&self, predicate: P) -> Option<&StateHistoryEntry>
    where
        P: Fn(&StateHistoryEntry) -> bool,
    {
        self.0.iter().rev().find(|entry| predicate(entry))
    }

    /// Most recent entry for `state`.
    pub fn last_entry_for(&self, state: ConversationState) -> Option<&StateHistoryEntry> {
        self.find_last(|entry| entry.state == state)
    }

    /// State the session held right before its most recent pause
    /// transition. Restores and imports that land in `Paused` are skipped.
    pub fn state_before_pause(&self) -> Option<ConversationState> {
        self.0.iter().rev().find_map(|entry| match entry.event {
            HistoryEvent::Transition { from, .. } if entry.state == ConversationState::Paused => {
                Some(from)
            }
            _ => None,
        })
    }

    /// Returns true if timestamps strictly increase.
    pub fn is_ordered(&self) -> bool {
        self.0
            .windows(2)
            .all(|pair| pair[0].timestamp.is_before(&pair[1].timestamp))
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(from: ConversationState, trigger: Trigger) -> HistoryEvent {
        HistoryEvent::Transition { from, trigger }
    }

    #[test]
    fn timestamps_strictly_increase_even_in_a_tight_loop() {
        let mut history = StateHistory::new();
        for _ in 0..100 {
            history.push(
                ConversationState::RequirementsRefinement,
                SessionContext::new(),
                transition(
                    ConversationState::RequirementsRefinement,
                    Trigger::RefineRequirements,
                ),
                1_000,
            );
        }
        assert_eq!(history.len(), 100);
        assert!(history.is_ordered());
    }

    #[test]
    fn oldest_entries_are_evicted_first() {
        let mut history = StateHistory::new();
        history.push(
            ConversationState::Initial,
            SessionContext::new(),
            HistoryEvent::Created,
            2,
        );
        history.push(
            ConversationState::Welcome,
            SessionContext::new(),
            transition(ConversationState::Initial, Trigger::Begin),
            2,
        );
        history.push(
            ConversationState::RequirementsGathering,
            SessionContext::new(),
            transition(ConversationState::Welcome, Trigger::DescribeCourse),
            2,
        );

        let states: Vec<_> = history.entries().iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                ConversationState::Welcome,
                ConversationState::RequirementsGathering
            ]
        );
    }

    #[test]
    fn state_before_pause_reads_the_pause_entry() {
        let mut history = StateHistory::new();
        history.push(
            ConversationState::Paused,
            SessionContext::new(),
            transition(ConversationState::StructureReview, Trigger::Pause),
            10,
        );
        assert_eq!(
            history.state_before_pause(),
            Some(ConversationState::StructureReview)
        );
    }

    #[test]
    fn state_before_pause_looks_past_a_restore_into_paused() {
        let mut history = StateHistory::new();
        history.push(
            ConversationState::Paused,
            SessionContext::new(),
            transition(ConversationState::Welcome, Trigger::Pause),
            10,
        );
        history.push(
            ConversationState::Welcome,
            SessionContext::new(),
            transition(ConversationState::Paused, Trigger::Resume),
            10,
        );
        history.push(
            ConversationState::Paused,
            SessionContext::new(),
            HistoryEvent::CheckpointRestored {
                label: "parked".to_string(),
            },
            10,
        );
        assert_eq!(
            history.state_before_pause(),
            Some(ConversationState::Welcome)
        );
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let json = serde_json::to_value(transition(
            ConversationState::Welcome,
            Trigger::DescribeCourse,
        ))
        .unwrap();
        assert_eq!(json["kind"], "transition");
        assert_eq!(json["from"], "welcome");
        assert_eq!(json["trigger"], "describe_course");
    }
}
