//! Integration tests for camera capture
//!
//! This module exercises the camera engine against the mock media devices:
//! stream lifecycle, flip recovery, torch control, the bounded image set and
//! hand-off.

use fleetcap_core::{InspectionView, MemoryUploader, UploadProgress};
use fleetcap_media::capture::mock::MockMediaDevices;
use fleetcap_media::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn engine(devices: &MockMediaDevices, max_images: usize) -> CameraCapture {
    devices.set_frame_size(320, 240);
    CameraCapture::new(
        Arc::new(devices.clone()),
        CameraConfig {
            max_images,
            ..CameraConfig::default()
        },
        CompressionConfig::default(),
    )
    .unwrap()
}

// ============================================================================
// STREAM LIFECYCLE TESTS
// ============================================================================

#[tokio::test]
async fn test_camera_config_default() {
    let config = CameraConfig::default();

    assert_eq!(config.ideal_resolution, VideoResolution::HD);
    assert_eq!(config.default_facing, FacingMode::Environment);
    assert_eq!(config.max_images, 6);
    assert_eq!(config.capture_quality, 0.9);
}

#[tokio::test]
async fn test_start_requests_ideal_resolution() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);

    camera.start_camera(FacingMode::Environment).await.unwrap();

    let requests = devices.requests();
    assert_eq!(requests.len(), 1);
    let video = requests[0].video.unwrap();
    assert_eq!(video.facing_mode, FacingMode::Environment);
    assert_eq!(video.ideal_resolution, VideoResolution::new(1280, 720));
    assert!(!requests[0].audio);
    assert!(camera.session().is_active());
}

#[tokio::test]
async fn test_permission_denied_is_access_error() {
    let devices = MockMediaDevices::new();
    devices.deny_permission(true);
    let mut camera = engine(&devices, 6);
    let mut events = camera.subscribe_events();

    let error = camera.start_camera(FacingMode::User).await.unwrap_err();
    assert!(matches!(error, MediaError::CameraAccess { .. }));
    assert_eq!(error.category(), ErrorCategory::Device);
    assert!(!camera.session().is_active());
    assert_eq!(devices.requests().len(), 1);
    assert!(matches!(
        events.try_recv().unwrap(),
        CameraEvent::CaptureFailed { .. }
    ));
}

#[tokio::test]
async fn test_stop_releases_every_track() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);

    camera.start_camera(FacingMode::Environment).await.unwrap();
    assert_eq!(devices.live_tracks(), 1);

    camera.stop_camera();
    assert_eq!(devices.live_tracks(), 0);
    assert!(!camera.session().is_active());
}

#[tokio::test]
async fn test_engine_drop_releases_camera() {
    let devices = MockMediaDevices::new();
    {
        let mut camera = engine(&devices, 6);
        camera.start_camera(FacingMode::Environment).await.unwrap();
    }
    assert_eq!(devices.live_tracks(), 0);
}

// ============================================================================
// FLIP TESTS
// ============================================================================

#[tokio::test]
async fn test_flip_switches_camera() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();

    let outcome = camera.flip_camera().await.unwrap();
    assert_eq!(outcome, FlipOutcome::Switched(FacingMode::User));
    assert_eq!(camera.session().facing_mode(), FacingMode::User);

    // The old stream was stopped before the new one was requested
    assert_eq!(devices.live_tracks_at_requests(), vec![0, 0]);
    assert_eq!(devices.live_tracks(), 1);
}

#[tokio::test]
async fn test_flip_failure_reverts_facing_mode() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();
    devices.set_available(FacingMode::User, false);

    let outcome = camera.flip_camera().await.unwrap();
    assert!(matches!(
        outcome,
        FlipOutcome::Reverted {
            facing: FacingMode::Environment,
            ..
        }
    ));
    assert_eq!(camera.session().facing_mode(), FacingMode::Environment);
    assert!(camera.session().is_active());
    assert_eq!(devices.requests().len(), 3);
}

#[tokio::test]
async fn test_flip_and_revert_failure_is_switch_error() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();
    devices.set_available(FacingMode::User, false);
    devices.set_available(FacingMode::Environment, false);

    let error = camera.flip_camera().await.unwrap_err();
    assert!(matches!(error, MediaError::CameraSwitch { .. }));
    assert!(!camera.session().is_active());
    assert_eq!(devices.live_tracks(), 0);
    // One switch attempt and one revert, no further retries
    assert_eq!(devices.requests().len(), 3);
}

// ============================================================================
// FLASH TESTS
// ============================================================================

#[tokio::test]
async fn test_flash_toggles_when_supported() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();
    assert!(camera.session().torch_available());

    assert!(camera.toggle_flash().await.unwrap());
    assert!(!camera.toggle_flash().await.unwrap());
}

#[tokio::test]
async fn test_flash_noop_without_capability() {
    let devices = MockMediaDevices::new();
    devices.set_torch_supported(false);
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();

    assert!(!camera.toggle_flash().await.unwrap());
    assert!(!camera.session().torch_on());
}

#[tokio::test]
async fn test_flash_rejection_leaves_state_unchanged() {
    let devices = MockMediaDevices::new();
    devices.set_torch_fails(true);
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();

    let error = camera.toggle_flash().await.unwrap_err();
    assert!(matches!(error, MediaError::FlashControl { .. }));
    assert!(!camera.session().torch_on());
}

// ============================================================================
// IMAGE SET TESTS
// ============================================================================

#[tokio::test]
async fn test_capture_limit_and_delete_relabel() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 2);
    camera.start_camera(FacingMode::Environment).await.unwrap();

    assert_eq!(camera.capture_frame().await.unwrap(), 0);
    assert_eq!(camera.capture_frame().await.unwrap(), 1);
    let second = camera.images().get(1).unwrap().clone();

    let error = camera.capture_frame().await.unwrap_err();
    assert_eq!(error, MediaError::ImageSetFull { max: 2 });
    assert_eq!(camera.images().len(), 2);

    camera.delete_image(0).unwrap();
    assert_eq!(camera.images().len(), 1);
    assert_eq!(camera.images().get(0), Some(&second));
    assert_eq!(camera.images().label(0), Some(InspectionView::Front));
}

#[tokio::test]
async fn test_captured_image_is_compressed_jpeg() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    devices.set_frame_size(1600, 900);
    camera.start_camera(FacingMode::Environment).await.unwrap();

    camera.capture_frame().await.unwrap();
    let image = camera.images().get(0).unwrap();
    assert_eq!(image.format, fleetcap_core::ImageFormat::Jpeg);
    assert_eq!((image.width, image.height), (800, 450));
    assert!(image.byte_len() <= 500 * 1024);
}

#[tokio::test]
async fn test_capture_without_camera_adds_nothing() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);

    let error = camera.capture_frame().await.unwrap_err();
    assert_eq!(error, MediaError::CaptureNotActive);
    assert!(camera.images().is_empty());
}

struct BrokenShutter(AtomicUsize);

impl ShutterSound for BrokenShutter {
    fn play(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err("audio context suspended".into())
    }
}

#[tokio::test]
async fn test_shutter_failure_is_swallowed() {
    let devices = MockMediaDevices::new();
    let shutter = Arc::new(BrokenShutter(AtomicUsize::new(0)));
    let mut camera = engine(&devices, 6).with_shutter(shutter.clone());
    camera.start_camera(FacingMode::Environment).await.unwrap();

    assert!(camera.capture_frame().await.is_ok());
    assert_eq!(shutter.0.load(Ordering::SeqCst), 1);
    assert_eq!(camera.images().len(), 1);
}

// ============================================================================
// HAND-OFF TESTS
// ============================================================================

#[tokio::test]
async fn test_hand_off_failure_keeps_images() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    camera.start_camera(FacingMode::Environment).await.unwrap();
    camera.capture_frame().await.unwrap();
    camera.capture_frame().await.unwrap();

    let uploader = MemoryUploader::new("inspections/truck-1");
    uploader.fail_with("network unreachable");
    let error = camera
        .hand_off(&uploader, UploadProgress::silent())
        .await
        .unwrap_err();
    assert_eq!(
        error,
        MediaError::Upload {
            message: "network unreachable".to_string()
        }
    );
    assert_eq!(camera.images().len(), 2);

    uploader.recover();
    let progress = UploadProgress::silent();
    let receipt = camera.hand_off(&uploader, progress.clone()).await.unwrap();
    assert_eq!(receipt.locations.len(), 2);
    assert_eq!(progress.current(), 100);
    assert!(camera.images().is_empty());
    assert_eq!(uploader.image_batches()[0].len(), 2);
}

#[tokio::test]
async fn test_hand_off_empty_set_is_rejected() {
    let devices = MockMediaDevices::new();
    let mut camera = engine(&devices, 6);
    let uploader = MemoryUploader::new("x");

    let error = camera
        .hand_off(&uploader, UploadProgress::silent())
        .await
        .unwrap_err();
    assert!(matches!(error, MediaError::InvalidState { .. }));
    assert!(uploader.image_batches().is_empty());
}
