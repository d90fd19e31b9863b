//! Structured debug logging system

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Default directive used when neither a filter nor `RUST_LOG` is given
pub const DEFAULT_FILTER: &str = "info";

/// Logging setup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    /// Filter directive could not be parsed
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Offending directive
        directive: String,
        /// Parser message
        reason: String,
    },
}

/// Debug logger for structured logging
#[derive(Debug, Clone)]
pub struct DebugLogger {
    directive: String,
}

impl DebugLogger {
    /// Logger using `RUST_LOG`, or [`DEFAULT_FILTER`] when unset
    pub fn new() -> Self {
        let directive = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        Self { directive }
    }

    /// Logger with an explicit filter directive, e.g. `fleetcap_media=debug`
    pub fn with_filter(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
        }
    }

    /// Filter directive this logger installs
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Parse the directive into an [`EnvFilter`]
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.directive).map_err(|e| LoggingError::InvalidFilter {
            directive: self.directive.clone(),
            reason: e.to_string(),
        })
    }

    /// Install the global fmt subscriber
    ///
    /// Returns `Ok(false)` when a global subscriber was already installed,
    /// so calling this from several entry points is harmless.
    pub fn install(&self) -> Result<bool, LoggingError> {
        let filter = self.env_filter()?;
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(filter = %self.directive, "Logging initialized");
        }
        Ok(installed)
    }

    /// Initialize logging system
    pub fn init_logging(filter: Option<&str>) -> Result<bool, LoggingError> {
        match filter {
            Some(directive) => Self::with_filter(directive).install(),
            None => Self::new().install(),
        }
    }
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let result = DebugLogger::with_filter("fleetcap_media=loud").env_filter();
        assert!(matches!(result, Err(LoggingError::InvalidFilter { .. })));
    }

    #[test]
    fn test_init_is_idempotent() {
        DebugLogger::init_logging(Some("warn")).unwrap();
        let second = DebugLogger::init_logging(Some("debug")).unwrap();
        assert!(!second);
    }
}
