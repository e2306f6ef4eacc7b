//! CourseGenerator - Drives the states that call the text generator.
//!
//! A failed or unusable generation moves the session to `Error` with the
//! reason recorded, persists that, and returns `GenerationFailure`. No
//! placeholder content is ever written in its place.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::SessionStore;
use crate::domain::conversation::{
    keys, ConversationError, ConversationSession, ConversationState,
    CourseFlowMachine, MessageMetadata, Role, Trigger,
};
use crate::domain::course::{
    prompts, CourseError, CourseStructure, LessonContent, OutputSanitizer, QualityReport,
    QualityValidator,
};
use crate::domain::foundation::{SessionId, SessionStatus};
use crate::ports::{GenerationOptions, TextGenerator};

/// Sampling settings passed to every generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

/// Result of a quality check.
#[derive(Debug, Clone)]
pub struct QualityOutcome {
    pub session: ConversationSession,
    pub report: QualityReport,
}

/// Produces course outlines and lesson content for a session.
#[derive(Clone)]
pub struct CourseGenerator {
    store: SessionStore,
    generator: Arc<dyn TextGenerator>,
    machine: CourseFlowMachine,
    sanitizer: OutputSanitizer,
    validator: QualityValidator,
    settings: GenerationSettings,
}

impl CourseGenerator {
    pub fn new(
        store: SessionStore,
        generator: Arc<dyn TextGenerator>,
        machine: CourseFlowMachine,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            store,
            generator,
            machine,
            sanitizer: OutputSanitizer::new(),
            validator: QualityValidator::default(),
            settings,
        }
    }

    pub fn with_validator(mut self, validator: QualityValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Outlines the course from the collected requirements and moves the
    /// session from structure generation to structure review.
    pub async fn generate_structure(&self, id: SessionId) -> Result<ConversationSession, ConversationError> {
        let mut session = self.load_in(id, &[ConversationState::StructureGeneration], Trigger::StructureReady).await?;

        let requirements = session
            .context()
            .get_object(keys::REQUIREMENTS)
            .cloned()
            .unwrap_or_default();
        let prompt = prompts::structure_prompt(&requirements);

        let structure = match self.generate(&session, &prompt).await {
            Ok(value) => CourseStructure::from_value(value).map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };
        let structure = match structure {
            Ok(structure) => structure,
            Err(reason) => return Err(self.fail(session, reason).await),
        };

        session.set_context(keys::COURSE_STRUCTURE, structure.to_value());
        session.add_message(
            Role::Assistant,
            format!(
                "Drafted \"{}\": {} sections, {} lessons.",
                structure.title,
                structure.sections.len(),
                structure.lesson_count()
            ),
            MessageMetadata::default(),
        )?;
        self.machine.apply(&mut session, Trigger::StructureReady)?;
        self.store.save(&session).await?;

        info!(
            session_id = %id,
            lessons = structure.lesson_count(),
            "Course structure generated"
        );
        Ok(session)
    }

    /// Writes lesson content for the approved outline.
    ///
    /// In content generation the session then moves to content review. In
    /// content enhancement the content is rewritten using the last quality
    /// report as feedback and the session stays put.
    pub async fn generate_content(&self, id: SessionId) -> Result<ConversationSession, ConversationError> {
        let mut session = self
            .load_in(
                id,
                &[
                    ConversationState::ContentGeneration,
                    ConversationState::ContentEnhancement,
                ],
                Trigger::ContentReady,
            )
            .await?;

        let structure = match CourseStructure::from_context(session.context().get(keys::COURSE_STRUCTURE)) {
            Ok(structure) => structure,
            Err(CourseError::Missing(key)) => {
                return Err(ConversationError::MissingContext {
                    target: session.current_state(),
                    missing: vec![key],
                })
            }
            Err(e) => return Err(self.fail(session, e.to_string()).await),
        };
        let feedback = quality_feedback(session.context().get(keys::QUALITY_REPORT));
        let prompt = prompts::content_prompt(
            &structure,
            session.context().get_object(keys::REQUIREMENTS),
            &feedback,
        );

        let content = match self.generate(&session, &prompt).await {
            Ok(value) => LessonContent::from_value(value).map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };
        let content = match content {
            Ok(content) => content,
            Err(reason) => return Err(self.fail(session, reason).await),
        };

        session.set_context(keys::LESSON_CONTENT, content.to_value());
        session.add_message(
            Role::Assistant,
            format!(
                "Wrote {} lessons with {} quiz questions.",
                content.lessons.len(),
                content.quiz_question_count()
            ),
            MessageMetadata::default(),
        )?;
        if session.current_state() == ConversationState::ContentGeneration {
            self.machine.apply(&mut session, Trigger::ContentReady)?;
        }
        self.store.save(&session).await?;

        info!(
            session_id = %id,
            lessons = content.lessons.len(),
            state = %session.current_state(),
            "Lesson content generated"
        );
        Ok(session)
    }

    /// Checks the content against the outline. A pass moves the session to
    /// final review; a failure sends it back to content enhancement. Once
    /// enhancement has hit its refinement limit a failing check moves the
    /// session to `Error`.
    pub async fn validate_quality(&self, id: SessionId) -> Result<QualityOutcome, ConversationError> {
        let mut session = self
            .load_in(id, &[ConversationState::QualityValidation], Trigger::QualityPassed)
            .await?;

        let parsed = CourseStructure::from_context(session.context().get(keys::COURSE_STRUCTURE))
            .and_then(|structure| {
                LessonContent::from_context(session.context().get(keys::LESSON_CONTENT))
                    .map(|content| (structure, content))
            });
        let (structure, content) = match parsed {
            Ok(parsed) => parsed,
            Err(CourseError::Missing(key)) => {
                return Err(ConversationError::MissingContext {
                    target: ConversationState::FinalReview,
                    missing: vec![key],
                })
            }
            Err(e) => return Err(self.fail(session, e.to_string()).await),
        };

        let report = self.validator.validate(&structure, &content);
        session.set_context(keys::QUALITY_REPORT, report.to_value());
        session.add_message(
            Role::Assistant,
            format!(
                "Quality check {} with a score of {}.",
                if report.passed { "passed" } else { "failed" },
                report.score
            ),
            MessageMetadata::default(),
        )?;

        let next = if report.passed {
            Trigger::QualityPassed
        } else {
            Trigger::EnhanceContent
        };
        match self.machine.apply(&mut session, next) {
            Ok(_) => {}
            Err(ConversationError::RefinementLimitReached { limit, .. }) => {
                let reason = format!(
                    "quality check still failing after {} enhancement rounds (score {})",
                    limit, report.score
                );
                return Err(self.fail(session, reason).await);
            }
            Err(e) => return Err(e),
        }
        self.store.save(&session).await?;

        info!(
            session_id = %id,
            passed = report.passed,
            score = report.score,
            "Quality check finished"
        );
        Ok(QualityOutcome { session, report })
    }

    // ───────────────────────────────────────────────────────────────────
    // Internals
    // ───────────────────────────────────────────────────────────────────

    /// Loads the session and checks it is active in one of `states`.
    async fn load_in(
        &self,
        id: SessionId,
        states: &[ConversationState],
        trigger: Trigger,
    ) -> Result<ConversationSession, ConversationError> {
        let session = self.store.load(id).await?;
        if session.status() != SessionStatus::Active {
            return Err(ConversationError::InvalidStatusTransition {
                from: session.status(),
                to: SessionStatus::Active,
            });
        }
        let state = session.current_state();
        if !states.contains(&state) {
            return Err(ConversationError::InvalidTransition {
                state,
                trigger,
                valid_triggers: self.machine.ready_triggers(&session),
            });
        }
        Ok(session)
    }

    /// Calls the generator and extracts the JSON payload. Errors come back as
    /// a reason string for the session record.
    async fn generate(&self, session: &ConversationSession, prompt: &str) -> Result<Value, String> {
        let options = GenerationOptions::new()
            .with_system_prompt(prompts::SYSTEM_PROMPT)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .for_session(session.id());

        let text = self
            .generator
            .generate(prompt, &options)
            .await
            .map_err(|e| e.to_string())?;
        self.sanitizer
            .extract_json(&text.content)
            .map_err(|e| format!("unusable output: {}", e))
    }

    /// Moves the session to `Error`, persists it and returns the failure to
    /// report. A storage failure while persisting takes precedence.
    async fn fail(&self, mut session: ConversationSession, reason: String) -> ConversationError {
        let state = session.current_state();
        warn!(
            session_id = %session.id(),
            generator = self.generator.name(),
            state = %state,
            reason = %reason,
            "Generation failed"
        );
        self.machine.fail(&mut session, reason.clone());
        match self.store.save(&session).await {
            Ok(()) => ConversationError::generation(state, reason),
            Err(storage) => storage,
        }
    }
}

/// Error messages from the last quality report, if any.
fn quality_feedback(report: Option<&Value>) -> Vec<String> {
    report
        .and_then(|r| serde_json::from_value::<QualityReport>(r.clone()).ok())
        .map(|r| {
            r.issues
                .into_iter()
                .map(|issue| match issue.lesson {
                    Some(lesson) => format!("{} ({})", issue.message, lesson),
                    None => issue.message,
                })
                .collect()
        })
        .unwrap_or_default()
}
