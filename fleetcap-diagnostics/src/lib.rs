//! # Fleet Capture Diagnostics
//!
//! Logging setup and capture statistics for fleet inspection capture.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod capture_stats;
pub mod debug_logger;

// Re-export main types
pub use capture_stats::{CameraStats, CaptureStats, CaptureStatsCollector, VideoStats};
pub use debug_logger::{DebugLogger, LoggingError, DEFAULT_FILTER};
