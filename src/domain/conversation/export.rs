//! Portable, versioned session export.
//!
//! An export carries either the session inline (`session`) or, when
//! compressed, as base64-encoded gzip of its JSON (`data`).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use super::{ConversationError, ConversationSession};
use crate::domain::foundation::{SessionId, Timestamp};

/// Format version written by this build.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Major version this build can read.
const SUPPORTED_MAJOR_VERSION: u32 = 1;

/// What to include in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub include_history: bool,
    pub include_checkpoints: bool,
    /// Free-form message metadata (analytics, UI hints). State, trigger and
    /// pin flags are always kept.
    pub include_message_metadata: bool,
    pub compress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_history: true,
            include_checkpoints: true,
            include_message_metadata: true,
            compress: false,
        }
    }
}

/// Self-describing export blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    pub format_version: String,
    pub exported_at: Timestamp,
    /// Id of the exported session, for the caller's reference only; import
    /// never reuses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_session_id: Option<SessionId>,
    #[serde(default)]
    pub compressed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<ConversationSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl SessionExport {
    /// Packs `session` according to `options`.
    pub fn pack(
        session: &ConversationSession,
        options: &ExportOptions,
    ) -> Result<Self, ConversationError> {
        let source_id = session.id();
        let mut copy = session.clone();
        if !options.include_history {
            copy.strip_history();
        }
        if !options.include_checkpoints {
            copy.strip_checkpoints();
        }
        if !options.include_message_metadata {
            copy.strip_message_metadata();
        }

        let (session, data) = if options.compress {
            (None, Some(compress(&copy)?))
        } else {
            (Some(copy), None)
        };

        Ok(Self {
            format_version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: Timestamp::now(),
            source_session_id: Some(source_id),
            compressed: options.compress,
            session,
            data,
        })
    }

    /// Validates the blob and returns the session it carries.
    ///
    /// # Errors
    ///
    /// - `InvalidImportFormat` for unknown major versions, missing or
    ///   undecodable payloads
    pub fn unpack(self) -> Result<ConversationSession, ConversationError> {
        check_version(&self.format_version)?;

        match (self.compressed, self.session, self.data) {
            (false, Some(session), _) => Ok(session),
            (true, _, Some(data)) => decompress(&data),
            (false, None, _) => Err(ConversationError::import("missing session payload")),
            (true, _, None) => Err(ConversationError::import("compressed export has no data")),
        }
    }

    pub fn to_json(&self) -> Result<String, ConversationError> {
        serde_json::to_string(self)
            .map_err(|e| ConversationError::import(format!("cannot serialize export: {}", e)))
    }

    /// Parses an export from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConversationError> {
        serde_json::from_str(json)
            .map_err(|e| ConversationError::import(format!("malformed export: {}", e)))
    }
}

fn check_version(version: &str) -> Result<(), ConversationError> {
    let major = version
        .split('.')
        .next()
        .and_then(|m| m.trim().parse::<u32>().ok())
        .ok_or_else(|| {
            ConversationError::import(format!("unreadable format version '{}'", version))
        })?;
    if major != SUPPORTED_MAJOR_VERSION {
        return Err(ConversationError::import(format!(
            "unsupported format version '{}'",
            version
        )));
    }
    Ok(())
}

fn compress(session: &ConversationSession) -> Result<String, ConversationError> {
    let json = serde_json::to_vec(session)
        .map_err(|e| ConversationError::import(format!("cannot serialize session: {}", e)))?;
    let compression_failed =
        |e: std::io::Error| ConversationError::import(format!("compression failed: {}", e));
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(compression_failed)?;
    let bytes = encoder.finish().map_err(compression_failed)?;
    Ok(BASE64.encode(bytes))
}

fn decompress(data: &str) -> Result<ConversationSession, ConversationError> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| ConversationError::import(format!("data is not base64: {}", e)))?;
    let mut json = Vec::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut json)
        .map_err(|e| ConversationError::import(format!("data is not gzip: {}", e)))?;
    serde_json::from_slice(&json)
        .map_err(|e| ConversationError::import(format!("malformed session payload: {}", e)))
}
