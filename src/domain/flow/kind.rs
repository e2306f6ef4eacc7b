//! Flow strategy identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::expertise::Expertise;
use super::strategy::{
    AdaptiveFlow, ExpertFlow, ExploratoryFlow, FlowStrategy, GuidedFlow, LinearFlow,
};
use crate::domain::foundation::ValidationError;

/// How far a flow lets the conversation move with a `JumpTo` trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPolicy {
    /// Only table transitions.
    Never,
    /// Forward jumps over states whose context is already complete.
    SkipCompleted,
    /// Any linear state whose prerequisites hold.
    Anywhere,
}

/// The flow strategy a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Strict sequential progression.
    Linear,
    /// Skips states whose context is already populated.
    #[default]
    Adaptive,
    /// Free jumps to any state with satisfied prerequisites.
    Exploratory,
    /// A fixed menu of next actions.
    Guided,
    /// Minimal scaffolding; every action on offer, nothing recommended.
    Expert,
}

impl FlowKind {
    pub const ALL: [FlowKind; 5] = [
        FlowKind::Linear,
        FlowKind::Adaptive,
        FlowKind::Exploratory,
        FlowKind::Guided,
        FlowKind::Expert,
    ];

    pub fn jump_policy(&self) -> JumpPolicy {
        match self {
            FlowKind::Linear | FlowKind::Guided => JumpPolicy::Never,
            FlowKind::Adaptive => JumpPolicy::SkipCompleted,
            FlowKind::Exploratory | FlowKind::Expert => JumpPolicy::Anywhere,
        }
    }

    /// Returns true if the flow accepts free jumps.
    pub fn allows_jumps(&self) -> bool {
        self.jump_policy() == JumpPolicy::Anywhere
    }

    /// Default flow for an inferred expertise level.
    pub fn for_expertise(expertise: Expertise) -> Self {
        match expertise {
            Expertise::Beginner => FlowKind::Guided,
            Expertise::Intermediate => FlowKind::Adaptive,
            Expertise::Expert => FlowKind::Expert,
        }
    }

    /// The strategy implementing this flow.
    pub fn strategy(&self) -> &'static dyn FlowStrategy {
        match self {
            FlowKind::Linear => &LinearFlow,
            FlowKind::Adaptive => &AdaptiveFlow,
            FlowKind::Exploratory => &ExploratoryFlow,
            FlowKind::Guided => &GuidedFlow,
            FlowKind::Expert => &ExpertFlow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Linear => "linear",
            FlowKind::Adaptive => "adaptive",
            FlowKind::Exploratory => "exploratory",
            FlowKind::Guided => "guided",
            FlowKind::Expert => "expert",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowKind {
    type Err = ValidationError;

    /// Accepts the wire names case-insensitively, plus a few aliases
    /// users type into preference forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "linear" | "step_by_step" | "sequential" => Ok(FlowKind::Linear),
            "adaptive" | "auto" => Ok(FlowKind::Adaptive),
            "exploratory" | "explore" | "free" => Ok(FlowKind::Exploratory),
            "guided" | "guide" => Ok(FlowKind::Guided),
            "expert" | "advanced" => Ok(FlowKind::Expert),
            other => Err(ValidationError::invalid_format(
                "flow",
                format!("unknown flow '{}'", other),
            )),
        }
    }
}
