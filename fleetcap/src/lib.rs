//! # Fleet Capture
//!
//! Signature, photo and video capture for fleet vehicle inspections.
//!
//! ## Key Features
//!
//! - **Signature pad**: pointer and touch ink on a raster surface, exported as PNG
//! - **Inspection photos**: camera lifecycle, flip with revert, torch, and
//!   JPEG compression to a size budget
//! - **Bounded video**: camera+microphone clips with a hard time cap
//! - **Page flows**: agreement and punch in/out sequencing that reports
//!   every failure as a user notice
//! - **Two densities**: full and compact view models over the same engines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetcap::{FleetCap, MemoryUploader, MockMediaDevices, PunchDirection};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fleet_cap = FleetCap::init(Arc::new(MockMediaDevices::new()))?;
//!     let uploader = Arc::new(MemoryUploader::new("inspections/truck-7"));
//!
//!     let mut punch = fleet_cap.punch(PunchDirection::In, "truck-7", uploader)?;
//!     println!("{}", punch.photos().start().await);
//!     println!("{}", punch.photos().capture().await);
//!     println!("{}", punch.submit(None).await);
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use fleetcap_core::{
    inspection_folder, label_stored_files, list_labeled, CoreError, EncodedImage, ImageFormat,
    InspectionKind, InspectionView, LabeledFile, MemoryUploader, ProgressCallback,
    StorageCollaborator, UploadCollaborator, UploadProgress, UploadReceipt, VideoClip,
};

pub use fleetcap_media::{
    capture::mock::MockMediaDevices, CameraCapture, CameraConfig, CompressionConfig, FacingMode,
    FixedSurface, MediaDevices, MediaError, Point, SignatureConfig, SignaturePad, SurfaceEvent,
    SurfaceHost, VideoConfig, VideoRecorder,
};

#[cfg(feature = "diagnostics")]
pub use fleetcap_diagnostics::{CaptureStats, CaptureStatsCollector, DebugLogger};

// Public API modules
pub mod config;
pub mod error;
pub mod event;
pub mod flow;
pub mod view;

// Re-export main API types
pub use config::FleetCapConfig;
pub use error::{FleetCapError, FleetCapResult};
pub use event::{EventStream, FlowEvent};
pub use flow::{AgreementFlow, NoticeLevel, PhotoStep, PunchDirection, PunchFlow, UserNotice, VideoStep};
pub use view::{
    CameraControlsView, CaptureLayout, GalleryTile, GalleryView, LayoutOptions, RecordingView,
};

use std::sync::Arc;
use tracing::info;

/// Main entry point for fleet capture
///
/// Holds the validated configuration and the platform's media devices, and
/// builds engines and flows from them.
#[derive(Clone)]
pub struct FleetCap {
    config: Arc<FleetCapConfig>,
    devices: Arc<dyn MediaDevices>,
    #[cfg(feature = "diagnostics")]
    stats: CaptureStatsCollector,
}

impl FleetCap {
    /// Initialize with default settings
    pub fn init(devices: Arc<dyn MediaDevices>) -> FleetCapResult<Self> {
        Self::init_with(FleetCapConfig::default(), devices)
    }

    /// Initialize with custom configuration
    pub fn init_with(config: FleetCapConfig, devices: Arc<dyn MediaDevices>) -> FleetCapResult<Self> {
        config.validate()?;

        #[cfg(feature = "diagnostics")]
        if config.debug_logging {
            DebugLogger::init_logging(config.log_filter.as_deref())?;
        }

        info!(layout = ?config.layout, max_images = config.camera.max_images, "Fleet capture initialized");
        Ok(Self {
            config: Arc::new(config),
            devices,
            #[cfg(feature = "diagnostics")]
            stats: CaptureStatsCollector::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &FleetCapConfig {
        &self.config
    }

    /// Options for the configured layout
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions::for_layout(self.config.layout)
    }

    /// Statistics from every engine built by this instance
    ///
    /// Engines only report while a Tokio runtime is available.
    #[cfg(feature = "diagnostics")]
    pub fn stats(&self) -> CaptureStats {
        self.stats.snapshot()
    }

    /// New camera engine
    pub fn camera(&self) -> FleetCapResult<CameraCapture> {
        let camera = CameraCapture::new(
            self.devices.clone(),
            self.config.camera.clone(),
            self.config.compression.clone(),
        )?;
        #[cfg(feature = "diagnostics")]
        if tokio::runtime::Handle::try_current().is_ok() {
            self.stats.watch_camera(camera.subscribe_events());
        }
        Ok(camera)
    }

    /// New video engine
    pub fn recorder(&self) -> FleetCapResult<VideoRecorder> {
        let recorder = VideoRecorder::new(self.devices.clone(), self.config.video.clone())?;
        #[cfg(feature = "diagnostics")]
        if tokio::runtime::Handle::try_current().is_ok() {
            self.stats.watch_video(recorder.subscribe_events());
        }
        Ok(recorder)
    }

    /// New signature pad bound to `host`
    pub fn signature_pad(&self, host: Box<dyn SurfaceHost>) -> FleetCapResult<SignaturePad> {
        Ok(SignaturePad::initialize(host, self.config.signature.clone())?)
    }

    /// Vehicle checkout agreement flow
    pub fn agreement(
        &self,
        host: Box<dyn SurfaceHost>,
        uploader: Arc<dyn UploadCollaborator>,
    ) -> FleetCapResult<AgreementFlow> {
        Ok(AgreementFlow::new(
            self.signature_pad(host)?,
            self.camera()?,
            uploader,
        ))
    }

    /// Punch in/out flow for `vehicle_id`
    pub fn punch(
        &self,
        direction: PunchDirection,
        vehicle_id: impl Into<String>,
        uploader: Arc<dyn UploadCollaborator>,
    ) -> FleetCapResult<PunchFlow> {
        Ok(PunchFlow::new(
            direction,
            vehicle_id,
            self.camera()?,
            self.recorder()?,
            uploader,
            self.config.min_punch_photos,
        ))
    }
}

impl std::fmt::Debug for FleetCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetCap")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
