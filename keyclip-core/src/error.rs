//! Error types for ring operations.

use thiserror::Error;

use crate::status::Status;

/// Error returned by [`Ring`](crate::Ring) operations.
///
/// An absent record is never an error: loads return `Ok(None)` and
/// `exists`/`delete`/`clear` return `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum KeyClipError {
    /// The stored bytes are not valid UTF-8.
    #[error("failed to decode stored value as utf8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The JSON value is valid but its top level is not an object.
    #[error("expected a JSON object, found {found}")]
    NotAMapping { found: &'static str },

    /// The secure-storage backend reported a failure other than not-found.
    #[error("unhandled keychain error: {status}")]
    Unhandled { status: Status },
}

impl KeyClipError {
    /// The backend status behind this error, if it came from the backend.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Unhandled { status } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message without the error category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Unhandled { status } => status.message(),
            other => other.to_string(),
        }
    }
}

impl From<Status> for KeyClipError {
    fn from(status: Status) -> Self {
        Self::Unhandled { status }
    }
}

/// Result alias for ring operations.
pub type Result<T, E = KeyClipError> = std::result::Result<T, E>;
