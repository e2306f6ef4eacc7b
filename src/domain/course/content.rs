//! Generated lesson bodies and quiz questions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CourseError;

/// A multiple-choice quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub answer_index: usize,
}

/// The written content of one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonBody {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quiz: Vec<QuizQuestion>,
}

impl LessonBody {
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

/// All lesson content, stored under `lesson_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContent {
    pub lessons: Vec<LessonBody>,
}

impl LessonContent {
    /// Parses and validates generated content.
    pub fn from_value(value: Value) -> Result<Self, CourseError> {
        let content: LessonContent = serde_json::from_value(value)
            .map_err(|e| CourseError::Unusable(format!("lesson content: {}", e)))?;
        content.validate()?;
        Ok(content)
    }

    pub fn from_context(value: Option<&Value>) -> Result<Self, CourseError> {
        let value = value.ok_or_else(|| CourseError::Missing("lesson_content".to_string()))?;
        Self::from_value(value.clone())
    }

    pub fn validate(&self) -> Result<(), CourseError> {
        if self.lessons.is_empty() {
            return Err(CourseError::Unusable("no lessons were written".to_string()));
        }
        for lesson in &self.lessons {
            if lesson.title.trim().is_empty() {
                return Err(CourseError::Unusable("a lesson has no title".to_string()));
            }
            if lesson.body.trim().is_empty() {
                return Err(CourseError::Unusable(format!(
                    "lesson '{}' has no body",
                    lesson.title
                )));
            }
            for question in &lesson.quiz {
                if question.options.len() < 2 || question.answer_index >= question.options.len()
                {
                    return Err(CourseError::Unusable(format!(
                        "quiz question '{}' in lesson '{}' is malformed",
                        question.question, lesson.title
                    )));
                }
            }
        }
        Ok(())
    }

    /// Looks a lesson up by title, ignoring case and surrounding whitespace.
    pub fn lesson(&self, title: &str) -> Option<&LessonBody> {
        let wanted = title.trim().to_lowercase();
        self.lessons
            .iter()
            .find(|l| l.title.trim().to_lowercase() == wanted)
    }

    pub fn quiz_question_count(&self) -> usize {
        self.lessons.iter().map(|l| l.quiz.len()).sum()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
