//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `conversation` - Course-generation states, the session aggregate and export
//! - `flow` - Flow strategies, expertise inference and backtracking
//! - `course` - Requirements, outlines, lesson content and quality checks

pub mod conversation;
pub mod course;
pub mod flow;
pub mod foundation;
