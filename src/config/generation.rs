//! Text generation configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::GenerationSettings;

/// Generation retry, timeout and sampling settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Attempts per generation call, first try included
    pub max_attempts: u32,

    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,

    pub temperature: f32,

    pub max_tokens: u32,
}

impl GenerationConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Validate generation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::MustBePositive("generation.max_attempts"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("generation.timeout_secs"));
        }
        if self.max_tokens == 0 {
            return Err(ValidationError::MustBePositive("generation.max_tokens"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature);
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_secs: 120,
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.settings(), GenerationSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let config = GenerationConfig {
            temperature: 3.5,
            ..GenerationConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTemperature));
    }
}
