//! Heuristic extraction of course requirements from free text.
//!
//! Runs on every user message. Only fields that are clearly stated are
//! returned; nothing is guessed, so an empty result is common.

use serde_json::{Map, Value};

const COURSE_NOUNS: [&str; 6] = ["course", "class", "tutorial", "workshop", "bootcamp", "program"];

const TOPIC_MARKERS: [&[&str]; 6] = [
    &["course", "on"],
    &["course", "about"],
    &["class", "on"],
    &["teach"],
    &["teaching"],
    &["covering"],
];

/// Words that end a phrase being captured.
const STOP_WORDS: [&str; 14] = [
    "for", "to", "with", "that", "which", "who", "in", "and", "so", "because", "aimed", "targeting",
    "over", "across",
];

/// Words that may sit between the article and the course noun without being
/// part of the topic ("a short Python course").
const FILLER_WORDS: [&str; 10] = [
    "short", "long", "new", "online", "full", "complete", "comprehensive", "free", "quick", "small",
];

const BEGINNER_WORDS: [&str; 9] = [
    "beginner", "beginners", "introductory", "intro", "basic", "basics", "novice", "novices",
    "newcomers",
];
const INTERMEDIATE_WORDS: [&str; 1] = ["intermediate"];
const ADVANCED_WORDS: [&str; 5] = ["advanced", "expert", "experts", "experienced", "in-depth"];

const LESSON_UNITS: [&str; 4] = ["lesson", "module", "chapter", "unit"];
const DURATION_UNITS: [&str; 5] = ["minute", "hour", "day", "week", "month"];

const OBJECTIVE_MARKERS: [&str; 5] = [
    "learn how to ",
    "learn to ",
    "be able to ",
    "students will ",
    "learners will ",
];

const MAX_PHRASE_WORDS: usize = 6;
const MAX_OBJECTIVES: usize = 10;

/// Requirement fields found in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRequirements {
    pub topic: Option<String>,
    pub target_audience: Option<String>,
    pub difficulty_level: Option<String>,
    pub lesson_count: Option<u32>,
    pub duration: Option<String>,
    pub learning_objectives: Vec<String>,
}

impl ExtractedRequirements {
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.target_audience.is_none()
            && self.difficulty_level.is_none()
            && self.lesson_count.is_none()
            && self.duration.is_none()
            && self.learning_objectives.is_empty()
    }

    /// Returns `existing` with these fields layered on top. Scalars replace
    /// earlier values; learning objectives accumulate without duplicates.
    pub fn merged_into(&self, existing: Option<&Map<String, Value>>) -> Map<String, Value> {
        let mut merged = existing.cloned().unwrap_or_default();

        let scalars = [
            ("topic", self.topic.clone().map(Value::from)),
            ("target_audience", self.target_audience.clone().map(Value::from)),
            ("difficulty_level", self.difficulty_level.clone().map(Value::from)),
            ("lesson_count", self.lesson_count.map(Value::from)),
            ("duration", self.duration.clone().map(Value::from)),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                merged.insert(key.to_string(), value);
            }
        }

        if !self.learning_objectives.is_empty() {
            let mut objectives: Vec<Value> = merged
                .get("learning_objectives")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for objective in &self.learning_objectives {
                let value = Value::from(objective.as_str());
                if !objectives.contains(&value) {
                    objectives.push(value);
                }
            }
            merged.insert("learning_objectives".to_string(), Value::Array(objectives));
        }

        merged
    }
}

/// Stateless keyword and pattern matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementExtractor;

impl RequirementExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedRequirements {
        let words = tokenize(text);
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

        ExtractedRequirements {
            topic: topic(&words, &lower),
            target_audience: audience(&words, &lower),
            difficulty_level: difficulty(&lower),
            lesson_count: counted(&lower, &LESSON_UNITS).map(|(n, _)| n),
            duration: counted(&lower, &DURATION_UNITS).map(|(n, unit)| {
                if n == 1 {
                    format!("1 {}", unit)
                } else {
                    format!("{} {}s", n, unit)
                }
            }),
            learning_objectives: objectives(text),
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Matchers
// ───────────────────────────────────────────────────────────────────────────

/// Splits on whitespace and trims punctuation, keeping `+` and `#` so that
/// names like C++ and C# survive.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#' && c != '-')
                .to_string()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_stop(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

fn topic(words: &[String], lower: &[String]) -> Option<String> {
    // "a course on X", "teach X"
    for marker in TOPIC_MARKERS {
        if let Some(start) = find_sequence(lower, marker) {
            let phrase = phrase_after(words, lower, start + marker.len());
            if phrase.is_some() {
                return phrase;
            }
        }
    }

    // "a Python course", "an advanced Rust workshop"
    let noun = lower.iter().position(|w| {
        COURSE_NOUNS
            .iter()
            .any(|n| w.as_str() == *n || w.strip_suffix('s') == Some(*n))
    })?;
    let mut collected = Vec::new();
    for idx in (0..noun).rev() {
        let word = lower[idx].as_str();
        if matches!(word, "a" | "an" | "the" | "my" | "our" | "want" | "need" | "create" | "build")
            || is_stop(word)
        {
            break;
        }
        if FILLER_WORDS.contains(&word) || is_difficulty_word(word) {
            continue;
        }
        collected.push(words[idx].as_str());
        if collected.len() == MAX_PHRASE_WORDS {
            break;
        }
    }
    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    Some(collected.join(" "))
}

fn audience(words: &[String], lower: &[String]) -> Option<String> {
    for (idx, word) in lower.iter().enumerate() {
        let start = match word.as_str() {
            "for" => idx + 1,
            "aimed" if lower.get(idx + 1).map(String::as_str) == Some("at") => idx + 2,
            "targeting" => idx + 1,
            _ => continue,
        };
        // "for 3 weeks" is a duration, not an audience
        if lower.get(start).and_then(|w| parse_number(w)).is_some() {
            continue;
        }
        if let Some(phrase) = phrase_after(words, lower, start) {
            return Some(phrase);
        }
    }
    None
}

fn difficulty(lower: &[String]) -> Option<String> {
    let level = lower.iter().find_map(|w| {
        let w = w.as_str();
        if BEGINNER_WORDS.contains(&w) {
            Some("beginner")
        } else if INTERMEDIATE_WORDS.contains(&w) {
            Some("intermediate")
        } else if ADVANCED_WORDS.contains(&w) {
            Some("advanced")
        } else {
            None
        }
    })?;
    Some(level.to_string())
}

fn is_difficulty_word(word: &str) -> bool {
    BEGINNER_WORDS.contains(&word)
        || INTERMEDIATE_WORDS.contains(&word)
        || ADVANCED_WORDS.contains(&word)
}

/// Finds "<number> <unit>" and returns the number with the singular unit.
fn counted(lower: &[String], units: &[&'static str]) -> Option<(u32, &'static str)> {
    lower.windows(2).find_map(|pair| {
        let n = parse_number(&pair[0])?;
        let unit = units
            .iter()
            .find(|u| pair[1].as_str() == **u || pair[1].strip_suffix('s') == Some(**u))?;
        Some((n, *unit))
    })
}

fn parse_number(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return (n > 0).then_some(n);
    }
    const WORDS: [&str; 12] = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve",
    ];
    WORDS
        .iter()
        .position(|w| *w == word)
        .map(|idx| idx as u32 + 1)
}

fn objectives(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for sentence in text.split(['.', '!', '?', ';', '\n']) {
        let lower = sentence.to_lowercase();
        let Some((marker_at, marker)) = OBJECTIVE_MARKERS
            .iter()
            .find_map(|m| lower.find(m).map(|at| (at, *m)))
        else {
            continue;
        };
        // lowercasing can change byte offsets for some scripts
        let Some(rest) = sentence.get(marker_at + marker.len()..) else {
            continue;
        };
        for part in rest.split(',').flat_map(|p| p.split(" and ")) {
            let part = part.trim();
            if !part.is_empty() && found.len() < MAX_OBJECTIVES && !found.iter().any(|f| f == part) {
                found.push(part.to_string());
            }
        }
    }
    found
}

fn find_sequence(lower: &[String], marker: &[&str]) -> Option<usize> {
    lower
        .windows(marker.len())
        .position(|window| window.iter().zip(marker).all(|(w, m)| w == m))
}

/// Collects words from `start` up to the first stop word.
fn phrase_after(words: &[String], lower: &[String], start: usize) -> Option<String> {
    let phrase: Vec<&str> = lower
        .iter()
        .enumerate()
        .skip(start)
        .take_while(|(_, w)| !is_stop(w))
        .take(MAX_PHRASE_WORDS)
        .map(|(idx, _)| words[idx].as_str())
        .collect();
    if phrase.is_empty() {
        None
    } else {
        Some(phrase.join(" "))
    }
}
