//! Conversation domain module.
//!
//! The course-generation conversation: states, triggers and the transition
//! table, the session aggregate with its history and checkpoints, progress
//! scoring and the portable export format.

mod checkpoint;
pub mod context;
mod errors;
mod export;
mod history;
mod machine;
mod message;
pub mod progress;
mod session;
mod state;
pub mod transitions;
mod trigger;

pub use checkpoint::{Checkpoint, CheckpointSummary, SessionSnapshot};
pub use context::{keys, ContextDiff, SessionContext};
pub use errors::ConversationError;
pub use export::{ExportOptions, SessionExport, EXPORT_FORMAT_VERSION};
pub use history::{HistoryEvent, StateHistory, StateHistoryEntry};
pub use machine::{CourseFlowMachine, TransitionRecord, DEFAULT_MAX_REFINEMENT_ITERATIONS};
pub use message::{Message, MessageMetadata, Role};
pub use session::{status_for_state, ConversationSession, IdleStatus, SessionLimits};
pub use state::ConversationState;
pub use transitions::Destination;
pub use trigger::Trigger;
