//! Capture error types and handling
//!
//! Every failure a capture engine can report is one of the kinds below.
//! Engines return them from their public operations; page flows turn them
//! into user-facing messages with [`MediaError::user_message`].

use fleetcap_core::CoreError;
use thiserror::Error;

/// Main error type for capture operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Camera or microphone could not be acquired
    #[error("Camera access failed: {reason}")]
    CameraAccess {
        /// Failure reason
        reason: String,
    },

    /// Facing-mode flip failed and the revert failed too
    #[error("Camera switch failed: {reason}")]
    CameraSwitch {
        /// Failure reason
        reason: String,
    },

    /// Torch constraint rejected by the platform
    #[error("Flash control failed: {reason}")]
    FlashControl {
        /// Failure reason
        reason: String,
    },

    /// Frame grab, encode or compression failed
    #[error("Capture failed: {reason}")]
    Capture {
        /// Failure reason
        reason: String,
    },

    /// Upload collaborator reported a failure during hand-off
    #[error("Upload failed: {message}")]
    Upload {
        /// Collaborator message
        message: String,
    },

    /// Image set already holds its configured maximum
    #[error("Image limit reached: {max} images")]
    ImageSetFull {
        /// Configured maximum
        max: usize,
    },

    /// Operation needs an active stream
    #[error("Capture not active")]
    CaptureNotActive,

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Invalid state for operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// State error message
        message: String,
    },
}

/// Result type alias for capture operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Shorthand for a capture pipeline failure
    pub fn capture(reason: impl Into<String>) -> Self {
        MediaError::Capture {
            reason: reason.into(),
        }
    }

    /// Check if error is recoverable by the user retrying the action
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::CameraAccess { .. } => false,
            MediaError::CameraSwitch { .. } => true,
            MediaError::FlashControl { .. } => true,
            MediaError::Capture { .. } => true,
            MediaError::Upload { .. } => true,
            MediaError::ImageSetFull { .. } => false,
            MediaError::CaptureNotActive => true,
            MediaError::InvalidConfiguration { .. } => false,
            MediaError::InvalidState { .. } => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::CameraAccess { .. } => ErrorCategory::Device,
            MediaError::CameraSwitch { .. } => ErrorCategory::Device,
            MediaError::FlashControl { .. } => ErrorCategory::Device,
            MediaError::Capture { .. } => ErrorCategory::Capture,
            MediaError::Upload { .. } => ErrorCategory::Upload,
            MediaError::ImageSetFull { .. } => ErrorCategory::State,
            MediaError::CaptureNotActive => ErrorCategory::State,
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::InvalidState { .. } => ErrorCategory::State,
        }
    }

    /// Message shown to the user at the component boundary
    pub fn user_message(&self) -> String {
        match self {
            MediaError::CameraAccess { .. } => {
                "Unable to access the camera. Please check permissions and try again.".to_string()
            }
            MediaError::CameraSwitch { .. } => {
                "Could not switch cameras. Please restart the camera.".to_string()
            }
            MediaError::FlashControl { .. } => "Could not change the flash setting.".to_string(),
            MediaError::Capture { .. } => "Failed to capture the photo. Please try again.".to_string(),
            MediaError::Upload { message } => format!("Upload failed: {}", message),
            MediaError::ImageSetFull { max } => {
                format!("You can take at most {} photos. Delete one to retake it.", max)
            }
            MediaError::CaptureNotActive => "Start the camera first.".to_string(),
            MediaError::InvalidConfiguration { message } => {
                format!("Capture is misconfigured: {}", message)
            }
            MediaError::InvalidState { message } => message.clone(),
        }
    }
}

impl From<CoreError> for MediaError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Upload { message } => MediaError::Upload { message },
            CoreError::Storage { message } => MediaError::Upload { message },
            CoreError::Encoding { reason } => MediaError::Capture { reason },
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Camera, microphone and torch hardware
    Device,
    /// Frame grab and encode pipeline
    Capture,
    /// Hand-off to the upload collaborator
    Upload,
    /// State management errors
    State,
    /// Configuration and parameter errors
    Configuration,
}
