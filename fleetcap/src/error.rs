//! Facade error type

use fleetcap_core::CoreError;
use fleetcap_media::MediaError;
use thiserror::Error;

/// Errors raised while setting up the capture facade
///
/// Flow operations never return these; they report [`crate::UserNotice`]
/// values instead.
#[derive(Error, Debug)]
pub enum FleetCapError {
    /// Configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration parsed but holds invalid values
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Capture engine error
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Collaborator error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Logging could not be initialized
    #[cfg(feature = "diagnostics")]
    #[error(transparent)]
    Logging(#[from] fleetcap_diagnostics::LoggingError),
}

/// Result type alias for facade setup
pub type FleetCapResult<T> = Result<T, FleetCapError>;
