//! Prompt templates for the generation states.

use serde_json::{Map, Value};

use super::CourseStructure;

/// System prompt shared by every generation call.
pub const SYSTEM_PROMPT: &str = r#"You are an instructional designer helping an instructor build an online course.
Answer only with the JSON document requested. Do not add commentary before or after it."#;

const STRUCTURE_INSTRUCTIONS: &str = r#"Design the outline of a course from the requirements below.

Return JSON with this shape:
{
  "title": "Course title",
  "description": "One or two sentences",
  "sections": [
    {
      "title": "Section title",
      "description": "Optional",
      "lessons": [
        { "title": "Lesson title", "summary": "Optional", "duration_minutes": 15 }
      ]
    }
  ]
}

Every section needs at least one lesson. Lesson titles must be unique."#;

const CONTENT_INSTRUCTIONS: &str = r#"Write the lessons for the course outline below.

Return JSON with this shape:
{
  "lessons": [
    {
      "title": "Exact lesson title from the outline",
      "body": "The full lesson text",
      "key_points": ["Optional takeaways"],
      "quiz": [
        { "question": "...", "options": ["...", "..."], "answer_index": 0 }
      ]
    }
  ]
}

Write one entry per lesson in the outline, in outline order. Each quiz question
needs at least two options and answer_index must point at the correct one."#;

/// Builds the prompt for outlining a course.
pub fn structure_prompt(requirements: &Map<String, Value>) -> String {
    format!(
        "{}\n\nRequirements:\n{}",
        STRUCTURE_INSTRUCTIONS,
        render_fields(requirements)
    )
}

/// Builds the prompt for writing lesson content. Quality feedback from a
/// previous attempt is appended when present.
pub fn content_prompt(
    structure: &CourseStructure,
    requirements: Option<&Map<String, Value>>,
    feedback: &[String],
) -> String {
    let mut prompt = format!("{}\n\nCourse: {}\n", CONTENT_INSTRUCTIONS, structure.title);
    for section in &structure.sections {
        prompt.push_str(&format!("\nSection: {}\n", section.title));
        for lesson in &section.lessons {
            match &lesson.summary {
                Some(summary) => prompt.push_str(&format!("- {}: {}\n", lesson.title, summary)),
                None => prompt.push_str(&format!("- {}\n", lesson.title)),
            }
        }
    }
    if let Some(requirements) = requirements {
        prompt.push_str("\nRequirements:\n");
        prompt.push_str(&render_fields(requirements));
    }
    if !feedback.is_empty() {
        prompt.push_str("\nFix these problems from the previous draft:\n");
        for item in feedback {
            prompt.push_str(&format!("- {}\n", item));
        }
    }
    prompt
}

fn render_fields(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                    .collect::<Vec<_>>()
                    .join("; "),
                other => other.to_string(),
            };
            format!("- {}: {}\n", key.replace('_', " "), rendered)
        })
        .collect()
}
