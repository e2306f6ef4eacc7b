//! Text Generator Adapters.
//!
//! Implementations of the TextGenerator port.
//!
//! ## Available Adapters
//!
//! - `MockTextGenerator` - Scripted generator for testing
//! - `RetryingTextGenerator` - Wrapper adding retries and per-call timeouts

mod mock_generator;
mod retrying_generator;

pub use mock_generator::{MockTextGenerator, RecordedCall};
pub use retrying_generator::RetryingTextGenerator;
