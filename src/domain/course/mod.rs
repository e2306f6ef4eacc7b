//! Course domain module.
//!
//! What the conversation produces: requirements pulled from user messages,
//! the generated outline and lesson content, and the quality check that gates
//! final review.

mod content;
pub mod prompts;
mod quality;
mod requirements;
mod sanitizer;
mod structure;

use thiserror::Error;

pub use content::{LessonBody, LessonContent, QuizQuestion};
pub use quality::{
    IssueSeverity, QualityIssue, QualityReport, QualityValidator, DEFAULT_MIN_LESSON_WORDS,
    DEFAULT_PASSING_SCORE,
};
pub use requirements::{ExtractedRequirements, RequirementExtractor};
pub use sanitizer::{OutputError, OutputSanitizer, MAX_FIELD_LENGTH, MAX_RESPONSE_LENGTH};
pub use structure::{CourseStructure, LessonOutline, SectionOutline};

/// Errors raised while reading generated course material.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CourseError {
    #[error("Generated output is unusable: {0}")]
    Unusable(String),

    #[error("Context has no {0}")]
    Missing(String),

    #[error(transparent)]
    Output(#[from] OutputError),
}
