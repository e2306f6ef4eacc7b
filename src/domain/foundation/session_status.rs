//! SessionStatus enum: the lifecycle of a session, independent of where the
//! conversation itself stands.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StateMachine;

/// Lifecycle status of a conversation session.
///
/// A session may be `Paused` while its conversation state is, say,
/// requirements gathering; the two axes move independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Paused,
    Abandoned,
    Completed,
    Error,
}

impl SessionStatus {
    /// Returns true if the session counts against the per-owner limit.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Paused)
    }

    /// Returns true if the session can never become active again.
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionStatus::Abandoned | SessionStatus::Completed)
    }
}

impl StateMachine for SessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Active, Paused)
                | (Active, Completed)
                | (Active, Error)
                | (Active, Abandoned)
                | (Paused, Active)
                | (Paused, Error)
                | (Paused, Abandoned)
                // Recovery from Error happens only through backtracking.
                | (Error, Active)
                | (Error, Abandoned)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            Active => vec![Paused, Completed, Error, Abandoned],
            Paused => vec![Active, Error, Abandoned],
            Error => vec![Active, Abandoned],
            Abandoned | Completed => vec![],
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Abandoned => "abandoned",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}
