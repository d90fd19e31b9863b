//! Camera capture
//!
//! [`CaptureSession`] owns at most one camera stream and guarantees its
//! tracks are stopped on every exit path. [`CameraCapture`] combines a
//! session with the snapshot pipeline (grab, intermediate encode, quality
//! ladder) and the bounded [`ImageSet`], and hands finished sets to an
//! upload collaborator.

use crate::capture::{ActiveStream, FacingMode, MediaConstraints, MediaDevices, VideoResolution};
use crate::compress::{
    compress_with, decode_image, CompressionConfig, CompressionOutcome, ImageEncoder,
    JpegImageEncoder,
};
use crate::error::{MediaError, MediaResult};
use crate::image_set::{ImageSet, DEFAULT_MAX_IMAGES};
use crate::tracks::VideoFrame;
use chrono::Utc;
use fleetcap_core::{
    ImageUploadRequest, InspectionView, UploadCollaborator, UploadProgress, UploadReceipt,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Camera capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preferred stream resolution
    pub ideal_resolution: VideoResolution,
    /// Camera opened by a plain start
    pub default_facing: FacingMode,
    /// Maximum photos per inspection
    pub max_images: usize,
    /// Quality of the intermediate full-resolution encode
    pub capture_quality: f32,
    /// Play the shutter sound after a capture
    pub shutter_sound: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ideal_resolution: VideoResolution::HD,
            default_facing: FacingMode::Environment,
            max_images: DEFAULT_MAX_IMAGES,
            capture_quality: 0.9,
            shutter_sound: true,
        }
    }
}

impl CameraConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.ideal_resolution.width == 0 || self.ideal_resolution.height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }
        if self.max_images == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Max images must be > 0".to_string(),
            });
        }
        if self.capture_quality <= 0.0 || self.capture_quality > 1.0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Capture quality must be within (0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

/// Non-critical audio feedback played after a capture
pub trait ShutterSound: Send + Sync {
    fn play(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Result of a camera flip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Now streaming from the requested camera
    Switched(FacingMode),
    /// Requested camera failed; the original camera was restarted
    Reverted {
        facing: FacingMode,
        reason: String,
    },
}

/// Camera capture events
#[derive(Debug, Clone)]
pub enum CameraEvent {
    CameraStarted {
        facing: FacingMode,
        torch_available: bool,
    },
    CameraStopped,
    CameraFlipped {
        outcome: FlipOutcome,
    },
    FlashToggled {
        on: bool,
    },
    ImageCaptured {
        index: usize,
        view: InspectionView,
        bytes: usize,
        quality: f32,
        attempts: u32,
        within_budget: bool,
    },
    ImageDeleted {
        index: usize,
    },
    CaptureFailed {
        error: String,
    },
    HandOffCompleted {
        count: usize,
    },
    HandOffFailed {
        error: String,
    },
}

/// One camera stream and its torch state
///
/// At most one stream is held. Starting again releases the previous stream
/// before the new one is requested, and dropping the session releases it.
#[derive(Debug)]
pub struct CaptureSession {
    facing: FacingMode,
    resolution: VideoResolution,
    stream: Option<ActiveStream>,
    torch_available: bool,
    torch_on: bool,
}

impl CaptureSession {
    /// Inactive session preferring `facing`
    pub fn new(facing: FacingMode, resolution: VideoResolution) -> Self {
        Self {
            facing,
            resolution,
            stream: None,
            torch_available: false,
            torch_on: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing
    }

    pub fn torch_available(&self) -> bool {
        self.torch_available
    }

    pub fn torch_on(&self) -> bool {
        self.torch_on
    }

    /// Acquire a stream for `facing` and probe torch support
    pub async fn start(&mut self, devices: &dyn MediaDevices, facing: FacingMode) -> MediaResult<()> {
        if self.is_active() {
            warn!("Camera started while a stream is still active; releasing it first");
            self.stop();
        }

        let constraints = MediaConstraints::camera(facing, self.resolution);
        let stream = devices
            .get_user_media(constraints)
            .await
            .map_err(|e| MediaError::CameraAccess {
                reason: e.to_string(),
            })?;
        let stream = ActiveStream::new(stream);

        self.torch_available = stream
            .stream()
            .video_track()
            .map(|track| track.capabilities().torch)
            .unwrap_or(false);
        self.torch_on = false;
        self.facing = facing;
        self.stream = Some(stream);

        info!(%facing, torch = self.torch_available, "Camera started");
        Ok(())
    }

    /// Release every track of the active stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
            info!(facing = %self.facing, "Camera stopped");
        }
        self.torch_available = false;
        self.torch_on = false;
    }

    /// Switch to the opposite camera, reverting once on failure
    ///
    /// An inactive session only flips its preferred camera.
    pub async fn flip(&mut self, devices: &dyn MediaDevices) -> MediaResult<FlipOutcome> {
        let original = self.facing;
        let target = original.opposite();
        if !self.is_active() {
            self.facing = target;
            return Ok(FlipOutcome::Switched(target));
        }

        self.stop();
        let switch_error = match self.start(devices, target).await {
            Ok(()) => return Ok(FlipOutcome::Switched(target)),
            Err(e) => e,
        };
        warn!(%target, error = %switch_error, "Camera switch failed, restarting original camera");

        match self.start(devices, original).await {
            Ok(()) => Ok(FlipOutcome::Reverted {
                facing: original,
                reason: switch_error.to_string(),
            }),
            Err(revert_error) => Err(MediaError::CameraSwitch {
                reason: format!("{}; revert failed: {}", switch_error, revert_error),
            }),
        }
    }

    /// Toggle the torch; no-op without torch support
    pub async fn toggle_flash(&mut self) -> MediaResult<bool> {
        if !self.torch_available {
            return Ok(self.torch_on);
        }
        let track = self
            .stream
            .as_ref()
            .and_then(|stream| stream.stream().video_track())
            .ok_or(MediaError::CaptureNotActive)?;

        let next = !self.torch_on;
        track
            .apply_torch(next)
            .await
            .map_err(|e| MediaError::FlashControl {
                reason: e.to_string(),
            })?;
        self.torch_on = next;
        debug!(on = next, "Torch toggled");
        Ok(next)
    }

    /// Grab the current preview frame
    pub fn grab_frame(&self) -> MediaResult<VideoFrame> {
        let stream = self.stream.as_ref().ok_or(MediaError::CaptureNotActive)?;
        let frame = stream
            .stream()
            .grab_frame()
            .map_err(|e| MediaError::capture(e.to_string()))?;
        if !frame.is_ready() {
            return Err(MediaError::capture("Preview frame not ready"));
        }
        Ok(frame)
    }
}

/// Turn a raw frame into a compressed still
///
/// The frame is first encoded at `capture_quality` percent, then decoded and
/// run through the quality ladder.
pub fn process_frame(
    encoder: &dyn ImageEncoder,
    frame: VideoFrame,
    capture_quality: u8,
    compression: &CompressionConfig,
) -> MediaResult<CompressionOutcome> {
    let rgba = frame
        .into_rgba()
        .ok_or_else(|| MediaError::capture("Frame buffer does not match its dimensions"))?;
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
    let intermediate = encoder.encode_jpeg(&rgb, capture_quality)?;
    let decoded = decode_image(&intermediate)?;
    compress_with(encoder, &decoded, compression)
}

/// Camera capture engine
pub struct CameraCapture {
    devices: Arc<dyn MediaDevices>,
    config: CameraConfig,
    compression: CompressionConfig,
    encoder: Arc<dyn ImageEncoder>,
    session: CaptureSession,
    images: ImageSet,
    shutter: Option<Arc<dyn ShutterSound>>,
    event_tx: broadcast::Sender<CameraEvent>,
}

impl CameraCapture {
    /// Create an inactive engine
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        config: CameraConfig,
        compression: CompressionConfig,
    ) -> MediaResult<Self> {
        config.validate()?;
        compression.validate()?;
        let (event_tx, _) = broadcast::channel(100);

        Ok(Self {
            devices,
            session: CaptureSession::new(config.default_facing, config.ideal_resolution),
            images: ImageSet::new(config.max_images),
            config,
            compression,
            encoder: Arc::new(JpegImageEncoder),
            shutter: None,
            event_tx,
        })
    }

    /// Replace the JPEG encoder used by the pipeline
    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Attach shutter feedback
    pub fn with_shutter(mut self, shutter: Arc<dyn ShutterSound>) -> Self {
        self.shutter = Some(shutter);
        self
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn images(&self) -> &ImageSet {
        &self.images
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Subscribe to camera events
    pub fn subscribe_events(&self) -> broadcast::Receiver<CameraEvent> {
        self.event_tx.subscribe()
    }

    /// Start the camera facing `facing`
    pub async fn start_camera(&mut self, facing: FacingMode) -> MediaResult<()> {
        let result = self.session.start(self.devices.as_ref(), facing).await;
        match &result {
            Ok(()) => self.emit(CameraEvent::CameraStarted {
                facing,
                torch_available: self.session.torch_available(),
            }),
            Err(e) => self.emit(CameraEvent::CaptureFailed {
                error: e.to_string(),
            }),
        }
        result
    }

    /// Stop the camera and release the hardware
    pub fn stop_camera(&mut self) {
        if self.session.is_active() {
            self.session.stop();
            self.emit(CameraEvent::CameraStopped);
        }
    }

    /// Switch between front and rear cameras
    pub async fn flip_camera(&mut self) -> MediaResult<FlipOutcome> {
        let outcome = self.session.flip(self.devices.as_ref()).await?;
        self.emit(CameraEvent::CameraFlipped {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Toggle the torch, returning the new state
    pub async fn toggle_flash(&mut self) -> MediaResult<bool> {
        let was_on = self.session.torch_on();
        let on = self.session.toggle_flash().await?;
        if on != was_on {
            self.emit(CameraEvent::FlashToggled { on });
        }
        Ok(on)
    }

    /// Snapshot the preview and append the compressed still to the set
    pub async fn capture_frame(&mut self) -> MediaResult<usize> {
        match self.try_capture().await {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!(error = %e, "Capture failed");
                self.emit(CameraEvent::CaptureFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn try_capture(&mut self) -> MediaResult<usize> {
        if self.images.is_full() {
            return Err(MediaError::ImageSetFull {
                max: self.images.max_images(),
            });
        }
        let frame = self.session.grab_frame()?;

        let encoder = self.encoder.clone();
        let compression = self.compression.clone();
        let capture_quality = (self.config.capture_quality * 100.0).round() as u8;
        let outcome = tokio::task::spawn_blocking(move || {
            process_frame(encoder.as_ref(), frame, capture_quality, &compression)
        })
        .await
        .map_err(|e| MediaError::capture(format!("Capture worker failed: {}", e)))??;

        let index = self.images.push(outcome.image.clone())?;
        self.play_shutter();

        let view = InspectionView::from_position(index);
        info!(
            index,
            %view,
            bytes = outcome.estimated_bytes,
            quality = outcome.quality,
            "Photo captured"
        );
        self.emit(CameraEvent::ImageCaptured {
            index,
            view,
            bytes: outcome.estimated_bytes,
            quality: outcome.quality,
            attempts: outcome.attempts,
            within_budget: outcome.within_budget,
        });
        Ok(index)
    }

    fn play_shutter(&self) {
        if !self.config.shutter_sound {
            return;
        }
        if let Some(shutter) = &self.shutter {
            if let Err(e) = shutter.play() {
                debug!(error = %e, "Shutter sound unavailable");
            }
        }
    }

    /// Delete the photo at `index`
    pub fn delete_image(&mut self, index: usize) -> Option<fleetcap_core::EncodedImage> {
        let removed = self.images.remove(index);
        if removed.is_some() {
            self.emit(CameraEvent::ImageDeleted { index });
        }
        removed
    }

    /// Hand the photo set to `uploader`
    ///
    /// The set is cleared on success and kept intact on failure so the user
    /// can retry without retaking photos.
    pub async fn hand_off(
        &mut self,
        uploader: &dyn UploadCollaborator,
        progress: UploadProgress,
    ) -> MediaResult<UploadReceipt> {
        if self.images.is_empty() {
            return Err(MediaError::InvalidState {
                message: "No photos to upload".to_string(),
            });
        }

        let count = self.images.len();
        let request = ImageUploadRequest {
            images: self.images.images().to_vec(),
            timestamp: Utc::now(),
            upload_progress: progress,
        };

        match uploader.upload_images(request).await {
            Ok(receipt) => {
                info!(count, "Photo set handed off");
                self.images.clear();
                self.emit(CameraEvent::HandOffCompleted { count });
                Ok(receipt)
            }
            Err(e) => {
                warn!(error = %e, "Photo hand-off failed");
                self.emit(CameraEvent::HandOffFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn emit(&self, event: CameraEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::MockMediaDevices;

    #[tokio::test]
    async fn test_session_start_probes_torch() {
        let devices = MockMediaDevices::new();
        devices.set_torch_supported(false);
        let mut session = CaptureSession::new(FacingMode::Environment, VideoResolution::HD);

        session.start(&devices, FacingMode::User).await.unwrap();
        assert!(session.is_active());
        assert_eq!(session.facing_mode(), FacingMode::User);
        assert!(!session.torch_available());
        assert!(!session.toggle_flash().await.unwrap());
    }

    #[tokio::test]
    async fn test_session_drop_releases_tracks() {
        let devices = MockMediaDevices::new();
        {
            let mut session = CaptureSession::new(FacingMode::Environment, VideoResolution::HD);
            session.start(&devices, FacingMode::Environment).await.unwrap();
            assert_eq!(devices.live_tracks(), 1);
        }
        assert_eq!(devices.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_restart_releases_before_request() {
        let devices = MockMediaDevices::new();
        let mut session = CaptureSession::new(FacingMode::Environment, VideoResolution::HD);
        session.start(&devices, FacingMode::Environment).await.unwrap();
        session.start(&devices, FacingMode::Environment).await.unwrap();

        assert_eq!(devices.live_tracks_at_requests(), vec![0, 0]);
        assert_eq!(devices.live_tracks(), 1);
    }

    #[tokio::test]
    async fn test_inactive_flip_changes_preference() {
        let devices = MockMediaDevices::new();
        let mut session = CaptureSession::new(FacingMode::Environment, VideoResolution::HD);
        let outcome = session.flip(&devices).await.unwrap();
        assert_eq!(outcome, FlipOutcome::Switched(FacingMode::User));
        assert!(devices.requests().is_empty());
    }

    #[test]
    fn test_process_frame_rejects_malformed_buffer() {
        let frame = VideoFrame {
            width: 4,
            height: 4,
            data: vec![0u8; 3],
            timestamp: 0,
        };
        let result = process_frame(&JpegImageEncoder, frame, 90, &CompressionConfig::default());
        assert!(matches!(result, Err(MediaError::Capture { .. })));
    }
}
