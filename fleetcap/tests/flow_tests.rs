//! Integration tests for page-level flows
//!
//! Flows run against the mock media devices and the in-memory uploader.

use fleetcap::*;
use fleetcap_core::{ImageUploadRequest, VideoUploadRequest};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fleet_cap(devices: &MockMediaDevices) -> FleetCap {
    devices.set_frame_size(320, 240);
    FleetCap::init(Arc::new(devices.clone())).unwrap()
}

fn surface() -> Box<dyn SurfaceHost> {
    Box::new(FixedSurface {
        width: 300,
        height: 150,
    })
}

/// Stores like [`MemoryUploader`] but can reject photo batches or clips
#[derive(Default)]
struct FlakyUploader {
    inner: MemoryUploader,
    reject_photos: AtomicBool,
    reject_videos: AtomicBool,
}

#[async_trait::async_trait]
impl UploadCollaborator for FlakyUploader {
    async fn upload_images(&self, request: ImageUploadRequest) -> Result<UploadReceipt, CoreError> {
        let is_photos = request.images.iter().any(|i| i.format == ImageFormat::Jpeg);
        if is_photos && self.reject_photos.load(Ordering::SeqCst) {
            return Err(CoreError::upload("photos rejected"));
        }
        self.inner.upload_images(request).await
    }

    async fn upload_video(&self, request: VideoUploadRequest) -> Result<UploadReceipt, CoreError> {
        if self.reject_videos.load(Ordering::SeqCst) {
            return Err(CoreError::upload("clip rejected"));
        }
        self.inner.upload_video(request).await
    }
}

fn sign(flow: &mut AgreementFlow) {
    flow.handle_signature_event(SurfaceEvent::PointerDown(Point::new(10.0, 10.0)));
    flow.handle_signature_event(SurfaceEvent::PointerMove(Point::new(50.0, 50.0)));
    flow.handle_signature_event(SurfaceEvent::PointerUp);
}

// ============================================================================
// AGREEMENT FLOW TESTS
// ============================================================================

#[tokio::test]
async fn test_accept_requires_vehicle_and_signature() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(MemoryUploader::new("inspections"));
    let mut flow = fleet_cap(&devices).agreement(surface(), uploader).unwrap();

    let notice = flow.accept_agreement();
    assert_eq!(notice.level, NoticeLevel::Warning);

    flow.select_vehicle("truck-7");
    let notice = flow.accept_agreement();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(!flow.is_accepted());

    sign(&mut flow);
    assert!(flow.accept_agreement().is_success());
    assert!(flow.is_accepted());
}

#[tokio::test]
async fn test_selecting_vehicle_clears_signature() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(MemoryUploader::new("inspections"));
    let mut flow = fleet_cap(&devices).agreement(surface(), uploader).unwrap();
    let mut events = flow.subscribe();

    flow.select_vehicle("truck-7");
    sign(&mut flow);
    flow.accept_agreement();
    assert!(!flow.signature().is_empty());

    flow.select_vehicle("van-2");
    assert!(flow.signature().is_empty());
    assert!(!flow.is_accepted());
    assert_eq!(flow.vehicle_id(), Some("van-2"));

    let types: Vec<&str> = events.drain().iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec!["vehicle_selected", "agreement_accepted", "vehicle_selected"]
    );
}

#[tokio::test]
async fn test_agreement_submit_uploads_signature_then_photos() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(MemoryUploader::new("inspections/truck-7"));
    let mut flow = fleet_cap(&devices)
        .agreement(surface(), uploader.clone())
        .unwrap();

    flow.select_vehicle("truck-7");
    sign(&mut flow);
    flow.accept_agreement();
    flow.photos().start().await;
    assert!(flow.photos().capture().await.is_success());
    assert!(flow.photos().capture().await.is_success());

    let seen = Arc::new(AtomicU8::new(0));
    let seen_by_callback = seen.clone();
    let notice = flow
        .submit(Some(Arc::new(move |percent: u8| {
            seen_by_callback.fetch_max(percent, Ordering::SeqCst);
        })))
        .await;
    assert!(notice.is_success(), "{}", notice);
    assert_eq!(seen.load(Ordering::SeqCst), 100);

    let batches = uploader.image_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0][0].format, ImageFormat::Png);
    assert_eq!(batches[1].len(), 2);
    assert!(batches[1].iter().all(|i| i.format == ImageFormat::Jpeg));

    // Camera released and flow reset for the next checkout
    assert_eq!(devices.live_tracks(), 0);
    assert!(flow.photos().images().is_empty());
    assert!(!flow.is_accepted());
}

#[tokio::test]
async fn test_agreement_retry_does_not_resend_signature() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(FlakyUploader::default());
    uploader.reject_photos.store(true, Ordering::SeqCst);
    let mut flow = fleet_cap(&devices)
        .agreement(surface(), uploader.clone())
        .unwrap();

    flow.select_vehicle("truck-7");
    sign(&mut flow);
    flow.accept_agreement();
    flow.photos().start().await;
    flow.photos().capture().await;

    let notice = flow.submit(None).await;
    assert!(notice.is_error());
    assert_eq!(notice.message, "Upload failed: photos rejected");
    assert_eq!(flow.photos().images().len(), 1);
    assert!(flow.is_accepted());

    uploader.reject_photos.store(false, Ordering::SeqCst);
    assert!(flow.submit(None).await.is_success());
    let batches = uploader.inner.image_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0][0].format, ImageFormat::Png);
    assert_eq!(batches[1][0].format, ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_camera_denied_becomes_notice() {
    let devices = MockMediaDevices::new();
    devices.deny_permission(true);
    let uploader = Arc::new(MemoryUploader::new("inspections"));
    let mut flow = fleet_cap(&devices).agreement(surface(), uploader).unwrap();
    let mut events = flow.subscribe();

    let notice = flow.photos().start().await;
    assert!(notice.is_error());
    assert!(notice.message.contains("camera"));
    assert!(events.drain().iter().any(|e| e.is_error_event()));
}

// ============================================================================
// PUNCH FLOW TESTS
// ============================================================================

#[tokio::test]
async fn test_punch_requires_minimum_photos() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(MemoryUploader::new("inspections"));
    let mut flow = fleet_cap(&devices)
        .punch(PunchDirection::In, "truck-7", uploader.clone())
        .unwrap();

    let notice = flow.submit(None).await;
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(uploader.image_batches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_punch_out_with_time_limited_video() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(MemoryUploader::new("inspections/truck-7"));
    let config = FleetCapConfig {
        video: VideoConfig {
            max_duration_secs: 3,
            ..VideoConfig::default()
        },
        ..FleetCapConfig::default()
    };
    devices.set_frame_size(320, 240);
    let fleet_cap = FleetCap::init_with(config, Arc::new(devices.clone())).unwrap();
    let mut flow = fleet_cap
        .punch(PunchDirection::Out, "truck-7", uploader.clone())
        .unwrap();
    let mut events = flow.subscribe();

    flow.photos().start().await;
    flow.photos().capture().await;
    flow.photos().stop();

    flow.video().start().await;
    let notice = flow.submit(None).await;
    assert_eq!(notice.level, NoticeLevel::Warning);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(flow.video().has_clip());

    let notice = flow.submit(None).await;
    assert!(notice.is_success(), "{}", notice);
    assert_eq!(notice.message, "Punched out");
    assert_eq!(uploader.videos()[0].duration, 3);
    assert_eq!(devices.live_tracks(), 0);

    let events = events.drain();
    assert!(events.contains(&FlowEvent::VideoRecorded { duration_secs: 3 }));
    assert!(events.contains(&FlowEvent::Submitted {
        kind: InspectionKind::PunchOut,
        photos: 1,
        with_video: true,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_punch_video_failure_keeps_photos_uploaded() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(FlakyUploader::default());
    uploader.reject_videos.store(true, Ordering::SeqCst);
    let mut flow = fleet_cap(&devices)
        .punch(PunchDirection::In, "van-2", uploader.clone())
        .unwrap();

    flow.photos().start().await;
    flow.photos().capture().await;
    flow.video().start().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(flow.video().stop().is_success());

    let notice = flow.submit(None).await;
    assert!(notice.is_error());
    assert_eq!(notice.message, "Upload failed: clip rejected");
    assert_eq!(uploader.inner.image_batches().len(), 1);
    assert!(flow.video().has_clip());

    uploader.reject_videos.store(false, Ordering::SeqCst);
    assert!(flow.submit(None).await.is_success());
    assert_eq!(uploader.inner.image_batches().len(), 1);
    assert_eq!(uploader.inner.videos()[0].duration, 2);
}

#[tokio::test(start_paused = true)]
async fn test_punch_retry_uploads_photos_taken_after_failure() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(FlakyUploader::default());
    uploader.reject_videos.store(true, Ordering::SeqCst);
    let mut flow = fleet_cap(&devices)
        .punch(PunchDirection::In, "van-2", uploader.clone())
        .unwrap();
    let mut events = flow.subscribe();

    flow.photos().start().await;
    flow.photos().capture().await;
    flow.video().start().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    flow.video().stop();
    assert!(flow.submit(None).await.is_error());

    flow.photos().capture().await;
    flow.photos().capture().await;

    uploader.reject_videos.store(false, Ordering::SeqCst);
    assert!(flow.submit(None).await.is_success());

    let batches = uploader.inner.image_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[1].len(), 2);
    assert!(flow.photos().images().is_empty());
    assert!(events.drain().contains(&FlowEvent::Submitted {
        kind: InspectionKind::PunchIn,
        photos: 3,
        with_video: true,
    }));
}

// ============================================================================
// VIEW TESTS
// ============================================================================

#[tokio::test]
async fn test_both_layouts_share_engine_state() {
    let devices = MockMediaDevices::new();
    let uploader = Arc::new(MemoryUploader::new("inspections"));
    let mut flow = fleet_cap(&devices)
        .punch(PunchDirection::In, "truck-7", uploader)
        .unwrap();

    flow.photos().start().await;
    flow.photos().capture().await;
    flow.photos().capture().await;

    let full = LayoutOptions::for_layout(CaptureLayout::Full);
    let compact = LayoutOptions::for_layout(CaptureLayout::Compact);

    let controls = flow.photos().controls(full, false);
    assert_eq!(controls.capture_label, "Capture Rear (2/6)");
    assert!(controls.show_flip && controls.show_flash);
    let controls = flow.photos().controls(compact, false);
    assert_eq!(controls.capture_label, "2/6");
    assert!(!controls.show_flip);
    assert!(!flow.photos().controls(full, true).can_capture);

    let full_gallery = flow.photos().gallery(full);
    let compact_gallery = flow.photos().gallery(compact);
    assert_eq!(full_gallery.tiles.len(), compact_gallery.tiles.len());
    assert_eq!(full_gallery.tiles[1].caption.as_deref(), Some("Driver Side"));
    assert_eq!(compact_gallery.tiles[1].caption, None);

    let recording = flow.video().view(full, false);
    assert_eq!(recording.timer_label, "00:00 / 00:15");
    assert!(recording.can_start && !recording.can_stop);
}
