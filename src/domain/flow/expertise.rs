//! Heuristic expertise inference.
//!
//! Scores the user's own messages and any stated experience level into a
//! coarse label. The label only picks a default flow; it never gates a
//! feature.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::conversation::Message;

/// Coarse user expertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expertise {
    Beginner,
    Intermediate,
    Expert,
}

impl Expertise {
    /// Maps a stated level ("novice", "advanced", ...) to a label.
    pub fn from_stated(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "beginner" | "novice" | "new" | "first_time" | "basic" => Some(Expertise::Beginner),
            "intermediate" | "some" | "moderate" => Some(Expertise::Intermediate),
            "expert" | "advanced" | "professional" | "experienced" => Some(Expertise::Expert),
            _ => None,
        }
    }
}

impl fmt::Display for Expertise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Expertise::Beginner => "beginner",
            Expertise::Intermediate => "intermediate",
            Expertise::Expert => "expert",
        };
        f.write_str(label)
    }
}

/// Result of an inference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertiseAssessment {
    pub level: Expertise,
    /// Signed score; negative leans beginner, positive leans expert.
    pub score: f64,
    /// How many independent signals contributed.
    pub signals: usize,
}

impl ExpertiseAssessment {
    /// Returns true if nothing was observed and the level is a default.
    pub fn is_default(&self) -> bool {
        self.signals == 0
    }
}

/// Phrases users write when describing themselves as new to course design.
const NOVICE_PHRASES: [&str; 7] = [
    "i'm new",
    "i am new",
    "first course",
    "first time",
    "never created",
    "not sure how",
    "beginner at",
];

/// Phrases that signal prior experience.
const EXPERIENCED_PHRASES: [&str; 6] = [
    "years of experience",
    "i have taught",
    "i've taught",
    "i teach",
    "experienced instructor",
    "my previous courses",
];

/// Instructional-design vocabulary.
const TECHNICAL_TERMS: [&str; 14] = [
    "curriculum",
    "pedagogy",
    "pedagogical",
    "scaffolding",
    "rubric",
    "syllabus",
    "bloom",
    "taxonomy",
    "formative",
    "summative",
    "prerequisite",
    "competency",
    "modality",
    "andragogy",
];

const STATED_WEIGHT: f64 = 2.0;
const PHRASE_WEIGHT: f64 = 1.5;
const TERM_WEIGHT: f64 = 0.5;
const MAX_TERM_BONUS: f64 = 2.0;
const WORD_LENGTH_WEIGHT: f64 = 0.5;
const MIN_WORDS_FOR_LENGTH_SIGNAL: usize = 20;
const ENGAGED_MESSAGE_COUNT: usize = 10;
const ENGAGEMENT_WEIGHT: f64 = 0.5;

/// Scores user messages plus an optional stated level.
pub fn assess(messages: &[Message], stated_level: Option<&str>) -> ExpertiseAssessment {
    let mut score = 0.0;
    let mut signals = 0;

    if let Some(level) = stated_level.and_then(Expertise::from_stated) {
        signals += 1;
        score += match level {
            Expertise::Beginner => -STATED_WEIGHT,
            Expertise::Intermediate => 0.0,
            Expertise::Expert => STATED_WEIGHT,
        };
    }

    let user_text: Vec<String> = messages
        .iter()
        .filter(|m| m.is_from_user())
        .map(|m| m.content().to_lowercase())
        .collect();

    if user_text.len() >= ENGAGED_MESSAGE_COUNT {
        signals += 1;
        score += ENGAGEMENT_WEIGHT;
    }

    for text in &user_text {
        if NOVICE_PHRASES.iter().any(|p| text.contains(p)) {
            signals += 1;
            score -= PHRASE_WEIGHT;
        }
        if EXPERIENCED_PHRASES.iter().any(|p| text.contains(p)) {
            signals += 1;
            score += PHRASE_WEIGHT;
        }
    }

    let words: Vec<&str> = user_text
        .iter()
        .flat_map(|t| t.split(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| !w.is_empty())
        .collect();

    let terms: BTreeSet<&str> = words
        .iter()
        .filter_map(|w| TECHNICAL_TERMS.iter().find(|term| w.starts_with(*term)).copied())
        .collect();
    if !terms.is_empty() {
        signals += 1;
        score += (terms.len() as f64 * TERM_WEIGHT).min(MAX_TERM_BONUS);
    }

    if words.len() >= MIN_WORDS_FOR_LENGTH_SIGNAL {
        let average = words.iter().map(|w| w.chars().count()).sum::<usize>() as f64
            / words.len() as f64;
        if average > 6.0 {
            signals += 1;
            score += WORD_LENGTH_WEIGHT;
        } else if average < 4.0 {
            signals += 1;
            score -= WORD_LENGTH_WEIGHT;
        }
    }

    let level = if signals == 0 {
        Expertise::Intermediate
    } else if score <= -1.0 {
        Expertise::Beginner
    } else if score >= 1.5 {
        Expertise::Expert
    } else {
        Expertise::Intermediate
    };

    ExpertiseAssessment {
        level,
        score,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{MessageMetadata, Role};

    fn user(text: &str) -> Message {
        Message::new(Role::User, text, MessageMetadata::default()).unwrap()
    }

    #[test]
    fn no_signals_defaults_to_intermediate() {
        let assessment = assess(&[], None);
        assert_eq!(assessment.level, Expertise::Intermediate);
        assert!(assessment.is_default());
    }

    #[test]
    fn stated_level_wins_without_other_signals() {
        assert_eq!(assess(&[], Some("novice")).level, Expertise::Beginner);
        assert_eq!(assess(&[], Some("Advanced")).level, Expertise::Expert);
    }

    #[test]
    fn self_reported_novice_is_beginner() {
        let messages = vec![user("Hi! I'm new to this and it's my first course.")];
        assert_eq!(assess(&messages, None).level, Expertise::Beginner);
    }

    #[test]
    fn technical_vocabulary_leans_expert() {
        let messages = vec![
            user("I've taught this for years; the syllabus needs formative checks."),
            user("Use Bloom's taxonomy and a rubric per module, with scaffolding."),
        ];
        let assessment = assess(&messages, None);
        assert_eq!(assessment.level, Expertise::Expert);
        assert!(assessment.signals >= 2);
    }

    #[test]
    fn assistant_messages_are_ignored() {
        let assistant = Message::new(
            Role::Assistant,
            "Let's discuss pedagogy, rubric and syllabus design.",
            MessageMetadata::default(),
        )
        .unwrap();
        assert!(assess(&[assistant], None).is_default());
    }

    #[test]
    fn unknown_stated_level_is_not_a_signal() {
        assert!(assess(&[], Some("wizard")).is_default());
    }
}
