//! Application layer - Services over the domain and the ports.
//!
//! `SessionManager` owns the session lifecycle and conversation turns,
//! `CourseGenerator` drives the states that call the text generator, and
//! both persist through `SessionStore`.

mod course_generator;
mod session_manager;
mod session_store;

pub use course_generator::{CourseGenerator, GenerationSettings, QualityOutcome};
pub use session_manager::{
    BacktrackOutcome, CleanupReport, CreatedSession, SessionManager, SessionManagerConfig,
    TurnOutcome,
};
pub use session_store::SessionStore;
