//! Flow handling for course-generation conversations.
//!
//! - `kind` - flow identifiers and jump policies
//! - `strategy` - the five flow strategies
//! - `expertise` - heuristic expertise inference for default flow choice
//! - `backtrack` - loss assessment and rollback
//! - `handler` - the facade the session manager talks to

mod action;
pub mod backtrack;
mod expertise;
mod handler;
mod kind;
mod strategy;

pub use action::{ActionKind, FlowAction};
pub use backtrack::{BacktrackPlan, LossAssessment};
pub use expertise::{assess as assess_expertise, Expertise, ExpertiseAssessment};
pub use handler::{FlowHandler, FlowSelection, EXPERIENCE_LEVEL_KEY, USER_PREFERENCE_KEY};
pub use kind::{FlowKind, JumpPolicy};
pub use strategy::{
    AdaptiveFlow, ExpertFlow, ExploratoryFlow, FlowStrategy, GuidedFlow, LinearFlow,
};
