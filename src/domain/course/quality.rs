//! Deterministic quality check over a course structure and its content.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::{CourseStructure, LessonContent};

/// Minimum score (0-100) a course needs to pass.
pub const DEFAULT_PASSING_SCORE: u8 = 70;

/// Minimum words a lesson body should have.
pub const DEFAULT_MIN_LESSON_WORDS: usize = 30;

const ERROR_PENALTY: u8 = 25;
const WARNING_PENALTY: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: IssueSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
}

impl QualityIssue {
    fn error(message: impl Into<String>, lesson: Option<&str>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
            lesson: lesson.map(str::to_string),
        }
    }

    fn warning(message: impl Into<String>, lesson: Option<&str>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
            lesson: lesson.map(str::to_string),
        }
    }
}

/// Result of a quality check, stored under `quality_report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub passed: bool,
    pub score: u8,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn errors(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Checks that every planned lesson was written, bodies are substantial and
/// titles are unique.
#[derive(Debug, Clone)]
pub struct QualityValidator {
    passing_score: u8,
    min_lesson_words: usize,
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new(DEFAULT_PASSING_SCORE, DEFAULT_MIN_LESSON_WORDS)
    }
}

impl QualityValidator {
    pub fn new(passing_score: u8, min_lesson_words: usize) -> Self {
        Self {
            passing_score: passing_score.min(100),
            min_lesson_words,
        }
    }

    pub fn validate(&self, structure: &CourseStructure, content: &LessonContent) -> QualityReport {
        let mut issues = Vec::new();

        for title in structure.lesson_titles() {
            if content.lesson(title).is_none() {
                issues.push(QualityIssue::error("planned lesson has no content", Some(title)));
            }
        }

        let mut seen = HashSet::new();
        for lesson in &content.lessons {
            let title = lesson.title.as_str();
            if !seen.insert(title.trim().to_lowercase()) {
                issues.push(QualityIssue::error("duplicate lesson title", Some(title)));
            }
            let words = lesson.word_count();
            if words < self.min_lesson_words {
                issues.push(QualityIssue::warning(
                    format!(
                        "lesson body has {} words, expected at least {}",
                        words, self.min_lesson_words
                    ),
                    Some(title),
                ));
            }
        }

        if content.quiz_question_count() == 0 {
            issues.push(QualityIssue::warning("course has no quiz questions", None));
        }

        let penalty: u32 = issues
            .iter()
            .map(|i| match i.severity {
                IssueSeverity::Error => u32::from(ERROR_PENALTY),
                IssueSeverity::Warning => u32::from(WARNING_PENALTY),
            })
            .sum();
        let score = 100u32.saturating_sub(penalty) as u8;
        let has_errors = issues.iter().any(|i| i.severity == IssueSeverity::Error);

        QualityReport {
            passed: !has_errors && score >= self.passing_score,
            score,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structure() -> CourseStructure {
        CourseStructure::from_value(json!({
            "title": "Python Basics",
            "sections": [{
                "title": "Getting started",
                "lessons": [{"title": "Variables"}, {"title": "Loops"}]
            }]
        }))
        .unwrap()
    }

    fn body(words: usize) -> String {
        vec!["word"; words].join(" ")
    }

    fn content(titles: &[&str], words: usize) -> LessonContent {
        let lessons: Vec<Value> = titles
            .iter()
            .map(|t| {
                json!({
                    "title": t,
                    "body": body(words),
                    "quiz": [{"question": "q", "options": ["a", "b"], "answer_index": 1}]
                })
            })
            .collect();
        LessonContent::from_value(json!({ "lessons": lessons })).unwrap()
    }

    #[test]
    fn complete_content_passes() {
        let report = QualityValidator::default().validate(&structure(), &content(&["Variables", "Loops"], 40));
        assert!(report.passed);
        assert_eq!(report.score, 100);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn missing_lesson_fails() {
        let report = QualityValidator::default().validate(&structure(), &content(&["Variables"], 40));
        assert!(!report.passed);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.issues[0].lesson.as_deref(), Some("Loops"));
    }

    #[test]
    fn short_lessons_only_warn() {
        let report = QualityValidator::default().validate(&structure(), &content(&["Variables", "Loops"], 5));
        assert_eq!(report.score, 90);
        assert!(report.passed);
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn passing_score_is_configurable() {
        let report = QualityValidator::new(95, 30).validate(&structure(), &content(&["Variables", "Loops"], 5));
        assert!(!report.passed);
    }
}
