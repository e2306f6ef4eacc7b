//! Course outline: sections and lessons.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CourseError;

/// One lesson in the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonOutline {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// A section grouping lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutline {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonOutline>,
}

/// The generated course outline stored under `course_structure`.
///
/// # Invariants
///
/// - `title` is non-blank
/// - there is at least one section, and every section has a titled lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStructure {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sections: Vec<SectionOutline>,
}

impl CourseStructure {
    /// Parses and validates an outline from generated JSON.
    pub fn from_value(value: Value) -> Result<Self, CourseError> {
        let structure: CourseStructure = serde_json::from_value(value)
            .map_err(|e| CourseError::Unusable(format!("course outline: {}", e)))?;
        structure.validate()?;
        Ok(structure)
    }

    /// Reads the outline back out of session context.
    pub fn from_context(value: Option<&Value>) -> Result<Self, CourseError> {
        let value = value.ok_or_else(|| CourseError::Missing("course_structure".to_string()))?;
        Self::from_value(value.clone())
    }

    pub fn validate(&self) -> Result<(), CourseError> {
        if self.title.trim().is_empty() {
            return Err(CourseError::Unusable("course title is empty".to_string()));
        }
        if self.sections.is_empty() {
            return Err(CourseError::Unusable("course has no sections".to_string()));
        }
        for (index, section) in self.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                return Err(CourseError::Unusable(format!(
                    "section {} has no title",
                    index + 1
                )));
            }
            if section.lessons.is_empty() {
                return Err(CourseError::Unusable(format!(
                    "section '{}' has no lessons",
                    section.title
                )));
            }
            if section.lessons.iter().any(|l| l.title.trim().is_empty()) {
                return Err(CourseError::Unusable(format!(
                    "section '{}' has an untitled lesson",
                    section.title
                )));
            }
        }
        Ok(())
    }

    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }

    /// Lesson titles in course order.
    pub fn lesson_titles(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.lessons.iter().map(|l| l.title.as_str()))
    }

    /// Total planned minutes, counting only lessons that declare a duration.
    pub fn planned_minutes(&self) -> u32 {
        self.sections
            .iter()
            .flat_map(|s| s.lessons.iter())
            .filter_map(|l| l.duration_minutes)
            .sum()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outline() -> Value {
        json!({
            "title": "Python for Beginners",
            "sections": [
                {"title": "Basics", "lessons": [
                    {"title": "Variables", "duration_minutes": 15},
                    {"title": "Loops"}
                ]},
                {"title": "Functions", "lessons": [{"title": "Defining functions", "duration_minutes": 20}]}
            ]
        })
    }

    #[test]
    fn parses_a_valid_outline() {
        let structure = CourseStructure::from_value(outline()).unwrap();
        assert_eq!(structure.lesson_count(), 3);
        assert_eq!(structure.planned_minutes(), 35);
        assert_eq!(
            structure.lesson_titles().collect::<Vec<_>>(),
            vec!["Variables", "Loops", "Defining functions"]
        );
    }

    #[test]
    fn section_without_lessons_is_unusable() {
        let value = json!({"title": "T", "sections": [{"title": "Empty"}]});
        assert!(matches!(
            CourseStructure::from_value(value),
            Err(CourseError::Unusable(msg)) if msg.contains("no lessons")
        ));
    }

    #[test]
    fn wrong_shape_is_unusable() {
        assert!(matches!(
            CourseStructure::from_value(json!({"sections": "nope"})),
            Err(CourseError::Unusable(_))
        ));
    }

    #[test]
    fn survives_a_round_trip_through_context() {
        let structure = CourseStructure::from_value(outline()).unwrap();
        let back = CourseStructure::from_context(Some(&structure.to_value())).unwrap();
        assert_eq!(back, structure);
        assert!(matches!(
            CourseStructure::from_context(None),
            Err(CourseError::Missing(_))
        ));
    }
}
