//! Sanitizing and JSON extraction for generated text.
//!
//! Generated output is untrusted: it is length-checked, stripped of control
//! characters and chat-template markers, and JSON is pulled out of fenced
//! blocks or surrounding prose before parsing.

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum accepted length of one generated response (200KB).
pub const MAX_RESPONSE_LENGTH: usize = 200_000;

/// Maximum length of a single string field after extraction (20KB).
pub const MAX_FIELD_LENGTH: usize = 20_000;

/// Chat-template markers that must never reach stored content.
const INJECTION_MARKERS: [&str; 11] = [
    "```system",
    "```assistant",
    "[INST]",
    "[/INST]",
    "<|system|>",
    "<|assistant|>",
    "<|user|>",
    "<|im_start|>",
    "<|im_end|>",
    "<<SYS>>",
    "<</SYS>>",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutputError {
    #[error("response too long: {actual} bytes exceeds maximum of {max} bytes")]
    TooLong { max: usize, actual: usize },

    #[error("response is empty")]
    Empty,

    #[error("no JSON found in response")]
    NoJson,

    #[error("JSON parse error: {0}")]
    Parse(String),
}

/// Cleans generated text and extracts structured payloads from it.
#[derive(Debug, Clone, Default)]
pub struct OutputSanitizer {
    additional_markers: Vec<String>,
}

impl OutputSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds extra markers to strip.
    pub fn with_additional_markers(mut self, markers: Vec<String>) -> Self {
        self.additional_markers = markers;
        self
    }

    /// Cleans a raw response for storage or display.
    pub fn sanitize(&self, response: &str) -> Result<String, OutputError> {
        if response.len() > MAX_RESPONSE_LENGTH {
            return Err(OutputError::TooLong {
                max: MAX_RESPONSE_LENGTH,
                actual: response.len(),
            });
        }

        let mut cleaned: String = response
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
            .collect();
        for marker in INJECTION_MARKERS {
            cleaned = cleaned.replace(marker, "");
        }
        for marker in &self.additional_markers {
            cleaned = cleaned.replace(marker.as_str(), "");
        }

        if cleaned.trim().is_empty() {
            return Err(OutputError::Empty);
        }
        Ok(cleaned)
    }

    /// Sanitizes `response` and parses the first JSON object or array in it.
    /// String fields in the result are stripped of HTML and truncated.
    pub fn extract_json(&self, response: &str) -> Result<Value, OutputError> {
        let cleaned = self.sanitize(response)?;
        let candidate = json_candidate(&cleaned).ok_or(OutputError::NoJson)?;
        let value: Value =
            serde_json::from_str(candidate).map_err(|e| OutputError::Parse(e.to_string()))?;
        Ok(clean_strings(value))
    }
}

/// Finds the JSON text inside a response: a fenced block if there is one,
/// otherwise the first balanced object or array.
fn json_candidate(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(block) = fenced_block(trimmed) {
        return Some(block);
    }

    let start = trimmed.find(['{', '['])?;
    balanced(trimmed, start)
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    let block = body[..end].trim();
    (!block.is_empty()).then_some(block)
}

fn balanced(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let (open, close) = match bytes[start] {
        b'{' => (b'{', b'}'),
        _ => (b'[', b']'),
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match *byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b if b == open => depth += 1,
            b if b == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn clean_strings(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_field(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_strings).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, clean_strings(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn clean_field(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    if result.len() > MAX_FIELD_LENGTH {
        let mut cut = MAX_FIELD_LENGTH;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
        result.push_str("...[truncated]");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod sanitize {
        use super::*;

        #[test]
        fn keeps_plain_text() {
            let s = OutputSanitizer::new();
            assert_eq!(s.sanitize("Hello\n\tWorld"), Ok("Hello\n\tWorld".to_string()));
        }

        #[test]
        fn rejects_oversized_response() {
            let s = OutputSanitizer::new();
            let long = "a".repeat(MAX_RESPONSE_LENGTH + 1);
            assert!(matches!(s.sanitize(&long), Err(OutputError::TooLong { .. })));
        }

        #[test]
        fn strips_markers_and_control_chars() {
            let s = OutputSanitizer::new();
            let out = s.sanitize("<|im_start|>Hi\x00 there[INST]").unwrap();
            assert_eq!(out, "Hi there");
        }

        #[test]
        fn blank_after_cleaning_is_empty() {
            let s = OutputSanitizer::new();
            assert_eq!(s.sanitize("<|im_end|>  "), Err(OutputError::Empty));
        }

        #[test]
        fn additional_markers_are_stripped() {
            let s = OutputSanitizer::new().with_additional_markers(vec!["@@".to_string()]);
            assert_eq!(s.sanitize("a@@b"), Ok("ab".to_string()));
        }
    }

    mod extract {
        use super::*;

        #[test]
        fn reads_fenced_json() {
            let s = OutputSanitizer::new();
            let text = "Here you go:\n```json\n{\"title\": \"Intro\"}\n```\nEnjoy!";
            assert_eq!(s.extract_json(text).unwrap(), json!({"title": "Intro"}));
        }

        #[test]
        fn reads_json_embedded_in_prose() {
            let s = OutputSanitizer::new();
            let text = "Sure! {\"a\": {\"b\": \"c}\"}} trailing words";
            assert_eq!(s.extract_json(text).unwrap(), json!({"a": {"b": "c}"}}));
        }

        #[test]
        fn handles_multibyte_text_before_json() {
            let s = OutputSanitizer::new();
            let text = "Voilà – résumé: [1, 2, 3]";
            assert_eq!(s.extract_json(text).unwrap(), json!([1, 2, 3]));
        }

        #[test]
        fn strips_html_from_string_fields() {
            let s = OutputSanitizer::new();
            let text = r#"{"body": "<script>x</script>Safe <b>text</b>"}"#;
            assert_eq!(s.extract_json(text).unwrap(), json!({"body": "xSafe text"}));
        }

        #[test]
        fn prose_without_json_fails() {
            let s = OutputSanitizer::new();
            assert_eq!(s.extract_json("no structure here"), Err(OutputError::NoJson));
        }

        #[test]
        fn broken_json_reports_parse_error() {
            let s = OutputSanitizer::new();
            assert!(matches!(
                s.extract_json("```json\n{\"a\": }\n```"),
                Err(OutputError::Parse(_))
            ));
        }
    }
}
