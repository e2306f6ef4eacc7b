//! State machine trait for lifecycle enums.
//!
//! Shared by the session status and the course-generation conversation state.
//! The trait only answers "may A become B"; trigger semantics and context
//! prerequisites live in the conversation transition table.

use super::ValidationError;

/// A lifecycle enum whose moves are checked against an explicit graph.
///
/// Implementors list the successors of each variant; `transition_to` and
/// `is_terminal` are derived from that list.
///
/// ```ignore
/// let next = SessionStatus::Active.transition_to(SessionStatus::Paused)?;
/// assert!(SessionStatus::Completed.is_terminal());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Whether `target` is a direct successor of `self`.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Direct successors of `self`, in a stable order.
    fn valid_transitions(&self) -> Vec<Self>;

    /// `target` if it is a direct successor, otherwise an
    /// `InvalidFormat` error on the `state_transition` field naming both ends.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "state_transition",
                format!("{:?} cannot move to {:?}", self, target),
            ));
        }
        Ok(target)
    }

    /// A variant with no successors.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Closed,
        Open,
        Bricked,
    }

    impl StateMachine for Door {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Door::Closed => vec![Door::Open, Door::Bricked],
                Door::Open => vec![Door::Closed],
                Door::Bricked => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Door::Closed.transition_to(Door::Open), Ok(Door::Open));
    }

    #[test]
    fn transition_to_reports_both_ends_on_failure() {
        let err = Door::Open.transition_to(Door::Bricked).unwrap_err();
        assert!(err.to_string().contains("Open"));
        assert!(err.to_string().contains("Bricked"));
    }

    #[test]
    fn is_terminal_follows_valid_transitions() {
        assert!(Door::Bricked.is_terminal());
        assert!(!Door::Closed.is_terminal());
    }
}
