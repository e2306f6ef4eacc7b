//! Identifiers for sessions, messages and owners.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Longest owner id the host platform hands over.
const MAX_USER_ID_LEN: usize = 128;

/// Declares a random v4 UUID newtype with display and parsing.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id! {
    /// Identifies a conversation session. Allocated at creation or import and
    /// never reused; it also names the session's storage record.
    SessionId
}

uuid_id! {
    /// Identifies one entry in a session's message log.
    MessageId
}

/// Owner of a session as handed over by the host platform.
///
/// The core trusts this value; authenticating it is the caller's job.
/// Surrounding whitespace is dropped so the same owner always maps to the
/// same per-owner limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// # Errors
    ///
    /// - `EmptyField` if blank
    /// - `InvalidFormat` if longer than 128 characters
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        if trimmed.chars().count() > MAX_USER_ID_LEN {
            return Err(ValidationError::invalid_format(
                "user_id",
                format!("longer than {} characters", MAX_USER_ID_LEN),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn fresh_ids_differ() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn session_id_round_trips_through_text() {
        let id: SessionId = format!(" {} ", SAMPLE).parse().unwrap();
        assert_eq!(id.to_string(), SAMPLE);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", SAMPLE));
        assert!("session-1".parse::<SessionId>().is_err());
    }

    #[test]
    fn user_id_is_trimmed() {
        let id = UserId::new("  owner-7 ").unwrap();
        assert_eq!(id.as_str(), "owner-7");
        assert_eq!(id, UserId::new("owner-7").unwrap());
    }

    #[test]
    fn user_id_rejects_blank_and_oversized_values() {
        assert_eq!(
            UserId::new("   ").unwrap_err(),
            ValidationError::empty_field("user_id")
        );
        assert!(matches!(
            UserId::new("x".repeat(MAX_USER_ID_LEN + 1)),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn user_id_deserialization_validates() {
        let id: UserId = serde_json::from_str("\"owner-7\"").unwrap();
        assert_eq!(id.as_str(), "owner-7");
        assert!(serde_json::from_str::<UserId>("\"  \"").is_err());
    }
}
