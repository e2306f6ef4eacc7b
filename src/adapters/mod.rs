//! Adapters - Implementations of port interfaces.
//!
//! - `storage` - Session record stores (in-memory, YAML files)
//! - `ai` - Text generators (scripted mock, retry decorator)

pub mod ai;
pub mod storage;
