//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `COURSEWRIGHT` prefix and nested values use double underscores as separators.
//! Every value has a default, so an empty environment yields a working
//! in-memory setup.
//!
//! # Example
//!
//! ```no_run
//! use coursewright::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Sessions kept for {} days", config.sessions.retention_days);
//! ```

mod error;
mod generation;
mod logging;
mod sessions;
mod storage;

pub use error::{ConfigError, ValidationError};
pub use generation::GenerationConfig;
pub use logging::LoggingConfig;
pub use sessions::SessionsConfig;
pub use storage::{StorageBackend, StorageConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Per-owner limits, log bounds, retention and idle timeout
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Text generator retries, timeout and sampling
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Session storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `COURSEWRIGHT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `COURSEWRIGHT__SESSIONS__MAX_PER_OWNER=5` -> `sessions.max_per_owner = 5`
    /// - `COURSEWRIGHT__STORAGE__BACKEND=file` -> `storage.backend = file`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COURSEWRIGHT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for zero limits, an idle warning window that
    /// is not shorter than the idle timeout, a file backend without a path,
    /// or an unparseable log filter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.sessions.validate()?;
        self.generation.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "COURSEWRIGHT__SESSIONS__MAX_PER_OWNER",
        "COURSEWRIGHT__SESSIONS__IDLE_WARNING_MINUTES",
        "COURSEWRIGHT__STORAGE__BACKEND",
        "COURSEWRIGHT__STORAGE__PATH",
        "COURSEWRIGHT__LOGGING__JSON",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_empty_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.sessions.max_per_owner, 5);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_overrides_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("COURSEWRIGHT__SESSIONS__MAX_PER_OWNER", "8");
        env::set_var("COURSEWRIGHT__STORAGE__BACKEND", "file");
        env::set_var("COURSEWRIGHT__STORAGE__PATH", "/var/lib/coursewright");
        env::set_var("COURSEWRIGHT__LOGGING__JSON", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.sessions.max_per_owner, 8);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, "/var/lib/coursewright");
        assert!(config.logging.json);
    }

    #[test]
    fn test_validate_rejects_long_warning_window() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("COURSEWRIGHT__SESSIONS__IDLE_WARNING_MINUTES", "45");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::WarningNotBeforeTimeout)
        );
    }

    #[test]
    fn test_unknown_backend_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("COURSEWRIGHT__STORAGE__BACKEND", "postgres");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
