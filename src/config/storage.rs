//! Session storage configuration

use serde::Deserialize;
use std::sync::Arc;

use super::error::ValidationError;
use crate::adapters::storage::{FileSessionStorage, InMemorySessionStorage};
use crate::ports::SessionStorage;

/// Which storage adapter holds sessions
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory holding one YAML file per session (file backend only)
    pub path: String,
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == StorageBackend::File && self.path.trim().is_empty() {
            return Err(ValidationError::MissingRequired("storage.path"));
        }
        Ok(())
    }

    /// Builds the configured adapter
    pub fn build(&self) -> Arc<dyn SessionStorage> {
        match self.backend {
            StorageBackend::Memory => Arc::new(InMemorySessionStorage::new()),
            StorageBackend::File => Arc::new(FileSessionStorage::new(&self.path)),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: "./data/sessions".to_string(),
        }
    }
}
