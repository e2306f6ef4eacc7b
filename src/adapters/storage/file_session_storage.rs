//! File-based Session Storage Adapter
//!
//! Stores each session record as `<base_path>/<session_id>.yaml`, readable
//! by hand for debugging.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::domain::foundation::{SessionId, UserId};
use crate::ports::{SessionRecord, SessionStorage, StorageError};

const EXTENSION: &str = "yaml";

/// File-based storage for session records
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    base_path: PathBuf,
}

impl FileSessionStorage {
    /// Create a new file storage with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let storage = FileSessionStorage::new("./data/sessions");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, key: SessionId) -> PathBuf {
        self.base_path.join(format!("{}.{}", key, EXTENSION))
    }

    async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))
    }

    async fn read_record(&self, key: SessionId, path: &Path) -> Result<SessionRecord, StorageError> {
        let yaml = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        serde_yaml::from_str(&yaml).map_err(|e| StorageError::Corrupt {
            key,
            reason: e.to_string(),
        })
    }

    /// Reads every parseable record. Unreadable files are logged and skipped
    /// so one bad file cannot hide the rest.
    async fn read_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::IoError(e.to_string())),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<SessionId>().ok())
            else {
                continue;
            };
            match self.read_record(key, &path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(session_id = %key, error = %e, "Skipping unreadable session record"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get(&self, key: SessionId) -> Result<Option<SessionRecord>, StorageError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        self.read_record(key, &path).await.map(Some)
    }

    async fn put(&self, record: SessionRecord) -> Result<(), StorageError> {
        self.ensure_dir().await?;

        let yaml = serde_yaml::to_string(&record)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))?;

        // Write beside the target and rename so readers never see half a file
        let path = self.record_path(record.session_id);
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        fs::write(&tmp, yaml)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))
    }

    async fn delete(&self, key: SessionId) -> Result<bool, StorageError> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(e.to_string())),
        }
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<SessionRecord>, StorageError> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .filter(|r| &r.owner_id == owner)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        self.read_all().await
    }
}
