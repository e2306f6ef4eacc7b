//! Session lifecycle configuration

use chrono::Duration;
use serde::Deserialize;

use super::error::ValidationError;
use crate::application::SessionManagerConfig;
use crate::domain::conversation::{SessionLimits, DEFAULT_MAX_REFINEMENT_ITERATIONS};

/// Session limits, retention and idle timeout
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionsConfig {
    /// Live sessions an owner may hold before the oldest is abandoned
    pub max_per_owner: usize,

    /// Messages kept per session (pinned markers excluded from trimming)
    pub max_messages: usize,

    /// State history entries kept per session
    pub max_state_history: usize,

    /// Days of inactivity before the cleanup sweep deletes a session
    pub retention_days: i64,

    pub idle_timeout_minutes: i64,

    pub idle_warning_minutes: i64,

    /// Times each refinement state may be entered
    pub max_refinement_iterations: u32,
}

impl SessionsConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_per_owner == 0 {
            return Err(ValidationError::MustBePositive("sessions.max_per_owner"));
        }
        if self.max_messages == 0 {
            return Err(ValidationError::MustBePositive("sessions.max_messages"));
        }
        if self.max_state_history == 0 {
            return Err(ValidationError::MustBePositive("sessions.max_state_history"));
        }
        if self.retention_days <= 0 {
            return Err(ValidationError::MustBePositive("sessions.retention_days"));
        }
        if self.idle_timeout_minutes <= 0 {
            return Err(ValidationError::MustBePositive("sessions.idle_timeout_minutes"));
        }
        if self.idle_warning_minutes <= 0 {
            return Err(ValidationError::MustBePositive("sessions.idle_warning_minutes"));
        }
        if self.idle_warning_minutes >= self.idle_timeout_minutes {
            return Err(ValidationError::WarningNotBeforeTimeout);
        }
        if self.max_refinement_iterations == 0 {
            return Err(ValidationError::MustBePositive(
                "sessions.max_refinement_iterations",
            ));
        }
        Ok(())
    }

    /// Tunables for the session manager
    pub fn manager_config(&self) -> SessionManagerConfig {
        SessionManagerConfig {
            max_sessions_per_owner: self.max_per_owner,
            limits: SessionLimits {
                max_messages: self.max_messages,
                max_state_history: self.max_state_history,
            },
            retention: Duration::days(self.retention_days),
            idle_timeout: Duration::minutes(self.idle_timeout_minutes),
            idle_warning: Duration::minutes(self.idle_warning_minutes),
            max_refinement_iterations: self.max_refinement_iterations,
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_per_owner: 5,
            max_messages: 100,
            max_state_history: 50,
            retention_days: 30,
            idle_timeout_minutes: 30,
            idle_warning_minutes: 5,
            max_refinement_iterations: DEFAULT_MAX_REFINEMENT_ITERATIONS,
        }
    }
}
