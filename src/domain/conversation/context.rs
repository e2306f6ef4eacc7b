//! The context bag a session carries across states.
//!
//! Keys map to arbitrary JSON values. Merging is shallow: top-level keys are
//! replaced wholesale, and an explicit `null` deletes the key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Well-known context keys used by the course-generation flow.
pub mod keys {
    /// Collected course requirements (object).
    pub const REQUIREMENTS: &str = "requirements";
    /// Generated course outline: sections and lessons.
    pub const COURSE_STRUCTURE: &str = "course_structure";
    /// Generated lesson bodies.
    pub const LESSON_CONTENT: &str = "lesson_content";
    /// Outcome of the quality check.
    pub const QUALITY_REPORT: &str = "quality_report";
    /// Identifier of the course created on the host platform.
    pub const CREATED_COURSE_ID: &str = "created_course_id";
    /// Course topic, mirrored from the requirements for quick access.
    pub const TOPIC: &str = "topic";
    /// Raw creation preferences handed to session creation.
    pub const PREFERENCES: &str = "preferences";
}

/// Returns true if `value` carries data: not null, not an empty string,
/// array or object.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Structured data accumulated by a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionContext(BTreeMap<String, Value>);

impl SessionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the string stored under `key`, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the object stored under `key`, if it is one.
    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Returns true if `key` holds a present value.
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).map(is_present).unwrap_or(false)
    }

    /// Returns the subset of `required` that is not present, preserving order.
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|key| !self.has(key))
            .map(|key| key.to_string())
            .collect()
    }

    /// Keys whose values are present.
    pub fn present_keys(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, value)| is_present(value))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Sets a single key. A `null` value deletes it.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Shallow-merges `partial` into this context.
    ///
    /// Keys absent from `partial` are left untouched; keys set to `null` are
    /// removed. Returns the keys that were touched.
    pub fn merge(&mut self, partial: Map<String, Value>) -> Vec<String> {
        let mut touched = Vec::with_capacity(partial.len());
        for (key, value) in partial {
            touched.push(key.clone());
            self.set(key, value);
        }
        touched
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Number of stored keys, present or not.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over stored entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Keys present here but absent (or not present) in `earlier`, plus keys
    /// whose value differs. Used to describe what a rollback would discard.
    pub fn diff_since(&self, earlier: &SessionContext) -> ContextDiff {
        let mut added = Vec::new();
        let mut changed = Vec::new();
        for (key, value) in self.0.iter().filter(|(_, v)| is_present(v)) {
            match earlier.0.get(key) {
                Some(old) if is_present(old) => {
                    if old != value {
                        changed.push(key.clone());
                    }
                }
                _ => added.push(key.clone()),
            }
        }
        ContextDiff { added, changed }
    }

    /// Returns true if every present key of `other` holds the same value here.
    pub fn is_superset_of(&self, other: &SessionContext) -> bool {
        other
            .0
            .iter()
            .filter(|(_, v)| is_present(v))
            .all(|(key, value)| self.0.get(key) == Some(value))
    }
}

impl From<Map<String, Value>> for SessionContext {
    fn from(map: Map<String, Value>) -> Self {
        let mut context = SessionContext::new();
        context.merge(map);
        context
    }
}

/// Difference between two context snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDiff {
    /// Keys that did not carry data in the earlier snapshot.
    pub added: Vec<String>,
    /// Keys whose value was replaced.
    pub changed: Vec<String>,
}

impl ContextDiff {
    /// Returns true if nothing would be lost.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn presence_rejects_empty_values() {
        assert!(!is_present(&Value::Null));
        assert!(!is_present(&json!("")));
        assert!(!is_present(&json!("   ")));
        assert!(!is_present(&json!([])));
        assert!(!is_present(&json!({})));
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(false)));
        assert!(is_present(&json!({"topic": "rust"})));
    }

    #[test]
    fn merge_is_shallow_and_keeps_untouched_keys() {
        let mut context = SessionContext::new();
        context.set("a", json!({"x": 1, "y": 2}));
        context.set("b", json!("keep"));

        context.merge(map(json!({"a": {"x": 3}})));

        assert_eq!(context.get("a"), Some(&json!({"x": 3})));
        assert_eq!(context.get_str("b"), Some("keep"));
    }

    #[test]
    fn explicit_null_deletes_key() {
        let mut context = SessionContext::new();
        context.set("a", json!(1));
        let touched = context.merge(map(json!({"a": null})));
        assert_eq!(touched, vec!["a".to_string()]);
        assert!(context.get("a").is_none());
    }

    #[test]
    fn missing_reports_absent_and_empty_keys() {
        let mut context = SessionContext::new();
        context.set(keys::REQUIREMENTS, json!({}));
        context.set(keys::COURSE_STRUCTURE, json!({"sections": [1]}));
        assert_eq!(
            context.missing(&[keys::REQUIREMENTS, keys::COURSE_STRUCTURE, keys::QUALITY_REPORT]),
            vec![keys::REQUIREMENTS.to_string(), keys::QUALITY_REPORT.to_string()]
        );
    }

    #[test]
    fn diff_since_reports_added_and_changed_keys() {
        let mut earlier = SessionContext::new();
        earlier.set("requirements", json!({"topic": "python"}));
        earlier.set("stable", json!(1));

        let mut later = earlier.clone();
        later.set("requirements", json!({"topic": "rust"}));
        later.set("course_structure", json!({"sections": []}));
        later.set("lesson_content", json!({"l1": "body"}));

        let diff = later.diff_since(&earlier);
        assert_eq!(diff.added, vec!["lesson_content".to_string()]);
        assert_eq!(diff.changed, vec!["requirements".to_string()]);
    }

    #[test]
    fn superset_ignores_empty_values() {
        let mut small = SessionContext::new();
        small.set("a", json!(1));
        small.set("b", json!(""));
        let mut big = small.clone();
        big.set("c", json!(2));
        big.remove("b");
        assert!(big.is_superset_of(&small));
        assert!(!small.is_superset_of(&big));
    }
}
