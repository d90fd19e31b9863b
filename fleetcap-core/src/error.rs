//! Error types for fleet capture collaborators

use thiserror::Error;

/// Error reported by the collaborators that sit outside the capture core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Upload collaborator rejected or failed a hand-off
    #[error("Upload failed: {message}")]
    Upload {
        /// Human-readable message supplied by the collaborator
        message: String,
    },

    /// Storage/list collaborator failed
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable message supplied by the collaborator
        message: String,
    },

    /// Artifact could not be encoded for hand-off
    #[error("Encoding failed: {reason}")]
    Encoding {
        /// Reason for the encoding failure
        reason: String,
    },
}

impl CoreError {
    /// Build an upload failure from any displayable collaborator error
    pub fn upload(message: impl Into<String>) -> Self {
        CoreError::Upload {
            message: message.into(),
        }
    }

    /// Build a storage failure from any displayable collaborator error
    pub fn storage(message: impl Into<String>) -> Self {
        CoreError::Storage {
            message: message.into(),
        }
    }

    /// Message that can be shown to the user as-is
    pub fn message(&self) -> &str {
        match self {
            CoreError::Upload { message } | CoreError::Storage { message } => message,
            CoreError::Encoding { reason } => reason,
        }
    }
}

/// Result type alias for collaborator operations
pub type CoreResult<T> = Result<T, CoreError>;
