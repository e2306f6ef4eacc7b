//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `SessionStorage` - Durable keyed store for session records
//! - `TextGenerator` - LLM text generation

mod session_storage;
mod text_generator;

pub use session_storage::{SessionRecord, SessionStorage, StorageError};
pub use text_generator::{
    FinishReason, GeneratedText, GenerationError, GenerationOptions, TextGenerator, TokenUsage,
};
