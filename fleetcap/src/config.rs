//! Configuration types and defaults

use crate::error::{FleetCapError, FleetCapResult};
use crate::view::CaptureLayout;
use fleetcap_media::{CameraConfig, CompressionConfig, SignatureConfig, VideoConfig};
use serde::{Deserialize, Serialize};

/// Global fleet capture configuration
///
/// Deserializes from partial documents: fields left out keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetCapConfig {
    /// Install the fmt log subscriber on init
    pub debug_logging: bool,
    /// Log filter directive; `RUST_LOG` or `info` when unset
    pub log_filter: Option<String>,
    /// Default rendering density
    pub layout: CaptureLayout,
    /// Photos a punch flow requires before submitting
    pub min_punch_photos: usize,
    /// Camera engine settings
    pub camera: CameraConfig,
    /// Photo compression settings
    pub compression: CompressionConfig,
    /// Video engine settings
    pub video: VideoConfig,
    /// Signature pad settings
    pub signature: SignatureConfig,
}

impl Default for FleetCapConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_filter: None,
            layout: CaptureLayout::Full,
            min_punch_photos: 1,
            camera: CameraConfig::default(),
            compression: CompressionConfig::default(),
            video: VideoConfig::default(),
            signature: SignatureConfig::default(),
        }
    }
}

impl FleetCapConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> FleetCapResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> FleetCapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every section
    pub fn validate(&self) -> FleetCapResult<()> {
        self.camera.validate()?;
        self.compression.validate()?;
        self.video.validate()?;
        self.signature.validate()?;
        if self.min_punch_photos > self.camera.max_images {
            return Err(FleetCapError::InvalidConfiguration {
                message: format!(
                    "min_punch_photos ({}) exceeds camera.max_images ({})",
                    self.min_punch_photos, self.camera.max_images
                ),
            });
        }
        Ok(())
    }
}
