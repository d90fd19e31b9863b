//! Page-level capture flows
//!
//! A flow sequences sign, capture and hand-off for one page and is the
//! component boundary for capture errors: every operation returns a
//! [`UserNotice`] and nothing propagates past it.

use crate::event::{EventSink, EventStream, FlowEvent};
use crate::view::{CameraControlsView, GalleryView, LayoutOptions, RecordingView};
use chrono::{DateTime, Utc};
use fleetcap_core::{
    inspection_folder, ImageUploadRequest, InspectionKind, InspectionView, ProgressCallback,
    UploadCollaborator, UploadProgress, UploadReceipt,
};
use fleetcap_media::{
    CameraCapture, FacingMode, FlipOutcome, ImageSet, MediaError, MediaResult, RecordingState,
    SignaturePad, StopReason, SurfaceEvent, VideoCaptureEvent, VideoRecorder,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Severity of a [`UserNotice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeLevel {
    /// Neutral information
    Info,
    /// An action completed
    Success,
    /// The action was refused; the user can fix it
    Warning,
    /// The action failed
    Error,
}

/// Message shown to the user after a flow operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotice {
    /// Severity
    pub level: NoticeLevel,
    /// Human-readable text
    pub message: String,
}

impl UserNotice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Informational notice
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    /// Success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    /// Warning notice
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    /// Error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Whether this reports a failure
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    /// Whether this reports success
    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

impl From<&MediaError> for UserNotice {
    fn from(error: &MediaError) -> Self {
        match error {
            MediaError::ImageSetFull { .. } | MediaError::CaptureNotActive => {
                UserNotice::warning(error.user_message())
            }
            _ => UserNotice::error(error.user_message()),
        }
    }
}

impl fmt::Display for UserNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn progress_reporter(events: &EventSink, on_progress: Option<ProgressCallback>) -> UploadProgress {
    let events = events.clone();
    UploadProgress::new(Arc::new(move |percent| {
        events.emit(FlowEvent::UploadProgress { percent });
        if let Some(callback) = &on_progress {
            callback(percent);
        }
    }))
}

/// Photo capture step shared by every flow
pub struct PhotoStep {
    camera: CameraCapture,
    events: EventSink,
}

impl PhotoStep {
    fn new(camera: CameraCapture, events: EventSink) -> Self {
        Self { camera, events }
    }

    /// Underlying engine
    pub fn camera(&self) -> &CameraCapture {
        &self.camera
    }

    /// Captured photos
    pub fn images(&self) -> &ImageSet {
        self.camera.images()
    }

    /// Start the configured default camera
    pub async fn start(&mut self) -> UserNotice {
        let facing = self.camera.config().default_facing;
        self.start_facing(facing).await
    }

    /// Start a specific camera
    pub async fn start_facing(&mut self, facing: FacingMode) -> UserNotice {
        match self.camera.start_camera(facing).await {
            Ok(()) => UserNotice::info("Camera ready"),
            Err(e) => self.failed(&e),
        }
    }

    /// Stop the camera; always safe to call
    pub fn stop(&mut self) {
        self.camera.stop_camera();
    }

    /// Switch between front and rear cameras
    pub async fn flip(&mut self) -> UserNotice {
        match self.camera.flip_camera().await {
            Ok(FlipOutcome::Switched(_)) => UserNotice::info("Camera switched"),
            Ok(FlipOutcome::Reverted { .. }) => self
                .events
                .notify(UserNotice::warning("Could not switch cameras. Still using the same camera.")),
            Err(e) => self.failed(&e),
        }
    }

    /// Toggle the torch
    pub async fn toggle_flash(&mut self) -> UserNotice {
        match self.camera.toggle_flash().await {
            Ok(true) => UserNotice::info("Flash on"),
            Ok(false) => UserNotice::info("Flash off"),
            Err(e) => self.failed(&e),
        }
    }

    /// Snapshot, compress and keep one photo
    pub async fn capture(&mut self) -> UserNotice {
        match self.camera.capture_frame().await {
            Ok(index) => {
                let view = InspectionView::from_position(index);
                self.events.emit(FlowEvent::PhotoCaptured { index, view });
                UserNotice::success(format!("{} photo captured", view))
            }
            Err(e) => self.failed(&e),
        }
    }

    /// Delete the photo at `index`
    pub fn delete(&mut self, index: usize) -> UserNotice {
        match self.camera.delete_image(index) {
            Some(_) => {
                self.events.emit(FlowEvent::PhotoDeleted { index });
                UserNotice::info("Photo deleted")
            }
            None => UserNotice::warning("That photo no longer exists."),
        }
    }

    /// Camera button states
    pub fn controls(&self, options: LayoutOptions, busy: bool) -> CameraControlsView {
        CameraControlsView::build(&self.camera, options, busy)
    }

    /// Photo gallery
    pub fn gallery(&self, options: LayoutOptions) -> GalleryView {
        GalleryView::build(self.camera.images(), options)
    }

    async fn hand_off(
        &mut self,
        uploader: &dyn UploadCollaborator,
        on_progress: Option<ProgressCallback>,
    ) -> MediaResult<UploadReceipt> {
        let progress = progress_reporter(&self.events, on_progress);
        self.camera.hand_off(uploader, progress).await
    }

    fn failed(&self, error: &MediaError) -> UserNotice {
        warn!(category = ?error.category(), error = %error, "Photo step failed");
        self.events.notify(UserNotice::from(error))
    }
}

/// Video capture step of the punch flows
pub struct VideoStep {
    recorder: VideoRecorder,
    events: EventSink,
}

impl VideoStep {
    fn new(recorder: VideoRecorder, events: EventSink) -> Self {
        forward_recorder_events(recorder.subscribe_events(), events.clone());
        Self { recorder, events }
    }

    /// Underlying engine
    pub fn recorder(&self) -> &VideoRecorder {
        &self.recorder
    }

    /// Start a bounded recording
    pub async fn start(&mut self) -> UserNotice {
        match self.recorder.start_recording().await {
            Ok(()) => UserNotice::info(format!(
                "Recording, up to {} seconds",
                self.recorder.max_duration_secs()
            )),
            Err(e) => self.failed(&e),
        }
    }

    /// Stop recording; also acknowledges a recording the time limit stopped
    pub fn stop(&mut self) -> UserNotice {
        match self.recorder.stop_recording() {
            Ok(clip) => UserNotice::success(format!("Recorded {}s clip", clip.duration_secs)),
            Err(e) => self.failed(&e),
        }
    }

    /// Whether a clip is waiting for hand-off
    pub fn has_clip(&self) -> bool {
        self.recorder.clip().is_some()
    }

    /// Timer and button states
    pub fn view(&self, options: LayoutOptions, busy: bool) -> RecordingView {
        RecordingView::build(&self.recorder, options, busy)
    }

    fn failed(&self, error: &MediaError) -> UserNotice {
        warn!(category = ?error.category(), error = %error, "Video step failed");
        self.events.notify(UserNotice::from(error))
    }
}

/// Relay recorder events that happen outside any flow call
///
/// The time limit stops a recording from the recorder's own timer task, so
/// its outcome reaches the flow's subscribers through this relay. Without a
/// runtime there is no timer either, and nothing is relayed.
fn forward_recorder_events(mut events: broadcast::Receiver<VideoCaptureEvent>, sink: EventSink) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!("No runtime; recorder events are not relayed");
        return;
    };
    handle.spawn(async move {
        loop {
            match events.recv().await {
                Ok(VideoCaptureEvent::ClipFinalized { duration_secs, .. }) => {
                    sink.emit(FlowEvent::VideoRecorded { duration_secs });
                }
                Ok(VideoCaptureEvent::RecordingStopped {
                    reason: StopReason::TimeLimit,
                    elapsed_secs,
                }) => {
                    sink.emit(FlowEvent::Notice {
                        notice: UserNotice::info(format!(
                            "Recording stopped at the {}-second limit",
                            elapsed_secs
                        )),
                    });
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Recorder relay fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Vehicle checkout agreement: select, sign, accept, photograph, submit
pub struct AgreementFlow {
    signature: SignaturePad,
    photos: PhotoStep,
    uploader: Arc<dyn UploadCollaborator>,
    vehicle_id: Option<String>,
    accepted: bool,
    signature_uploaded: bool,
    events: EventSink,
}

impl AgreementFlow {
    /// Create a flow around its engines
    pub fn new(
        signature: SignaturePad,
        camera: CameraCapture,
        uploader: Arc<dyn UploadCollaborator>,
    ) -> Self {
        let events = EventSink::default();
        Self {
            signature,
            photos: PhotoStep::new(camera, events.clone()),
            uploader,
            vehicle_id: None,
            accepted: false,
            signature_uploaded: false,
            events,
        }
    }

    /// Receive this flow's events; replaces any earlier stream
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Selected vehicle
    pub fn vehicle_id(&self) -> Option<&str> {
        self.vehicle_id.as_deref()
    }

    /// Whether the agreement has been accepted
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Signature pad, for layout and export
    pub fn signature(&mut self) -> &mut SignaturePad {
        &mut self.signature
    }

    /// Photo step
    pub fn photos(&mut self) -> &mut PhotoStep {
        &mut self.photos
    }

    /// Select the vehicle being checked out
    ///
    /// A different vehicle invalidates the signature and the acceptance.
    pub fn select_vehicle(&mut self, vehicle_id: impl Into<String>) -> UserNotice {
        let vehicle_id = vehicle_id.into();
        if vehicle_id.trim().is_empty() {
            return self.events.notify(UserNotice::warning("Select a vehicle."));
        }
        self.reset_signature();
        info!(%vehicle_id, "Vehicle selected");
        self.events.emit(FlowEvent::VehicleSelected {
            vehicle_id: vehicle_id.clone(),
        });
        self.vehicle_id = Some(vehicle_id);
        UserNotice::info("Vehicle selected")
    }

    /// Forward an input event to the signature pad
    pub fn handle_signature_event(&mut self, event: SurfaceEvent) {
        if self.accepted {
            debug!("Ignoring signature input after acceptance");
            return;
        }
        self.signature.handle_event(event);
    }

    /// Erase the signature and withdraw acceptance
    pub fn clear_signature(&mut self) {
        self.reset_signature();
        self.events.emit(FlowEvent::SignatureCleared);
    }

    fn reset_signature(&mut self) {
        self.signature.clear();
        self.accepted = false;
        self.signature_uploaded = false;
    }

    /// Accept the agreement; requires a vehicle and a signature
    pub fn accept_agreement(&mut self) -> UserNotice {
        let Some(vehicle_id) = self.vehicle_id.clone() else {
            return self.events.notify(UserNotice::warning("Select a vehicle first."));
        };
        if self.signature.is_empty() {
            return self
                .events
                .notify(UserNotice::warning("Please sign the agreement before accepting."));
        }
        self.accepted = true;
        info!(%vehicle_id, "Agreement accepted");
        self.events.emit(FlowEvent::AgreementAccepted { vehicle_id });
        UserNotice::success("Agreement accepted")
    }

    /// Folder this checkout's artifacts belong under
    pub fn storage_folder(&self, at: DateTime<Utc>) -> Option<String> {
        self.vehicle_id
            .as_deref()
            .map(|vehicle_id| inspection_folder(vehicle_id, InspectionKind::Agreement, at))
    }

    /// Hand the signature and photos to the uploader
    ///
    /// A failed photo upload keeps the photos; retrying does not upload the
    /// signature a second time.
    pub async fn submit(&mut self, on_progress: Option<ProgressCallback>) -> UserNotice {
        if !self.accepted {
            return self
                .events
                .notify(UserNotice::warning("Accept the agreement before submitting."));
        }
        if self.photos.images().is_empty() {
            return self
                .events
                .notify(UserNotice::warning("Capture at least one inspection photo."));
        }

        if !self.signature_uploaded {
            if let Err(notice) = self.upload_signature().await {
                return notice;
            }
            self.signature_uploaded = true;
        }

        let count = self.photos.images().len();
        if let Err(e) = self.photos.hand_off(self.uploader.as_ref(), on_progress).await {
            return self.photos.failed(&e);
        }

        self.photos.stop();
        self.reset_signature();
        info!(photos = count, "Agreement submitted");
        self.events.emit(FlowEvent::Submitted {
            kind: InspectionKind::Agreement,
            photos: count,
            with_video: false,
        });
        self.events.notify(UserNotice::success("Agreement submitted"))
    }

    async fn upload_signature(&mut self) -> Result<(), UserNotice> {
        let image = self.signature.export_image().map_err(|e| {
            warn!(error = %e, "Signature export failed");
            self.events.notify(UserNotice::from(&e))
        })?;
        let request = ImageUploadRequest {
            images: vec![image],
            timestamp: Utc::now(),
            upload_progress: UploadProgress::silent(),
        };
        self.uploader.upload_images(request).await.map_err(|e| {
            let error = MediaError::from(e);
            warn!(error = %error, "Signature upload failed");
            self.events.notify(UserNotice::from(&error))
        })?;
        Ok(())
    }
}

/// Direction of a punch flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PunchDirection {
    /// Start of shift
    In,
    /// End of shift
    Out,
}

impl PunchDirection {
    /// Inspection kind recorded for this direction
    pub fn kind(&self) -> InspectionKind {
        match self {
            PunchDirection::In => InspectionKind::PunchIn,
            PunchDirection::Out => InspectionKind::PunchOut,
        }
    }
}

impl fmt::Display for PunchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunchDirection::In => write!(f, "in"),
            PunchDirection::Out => write!(f, "out"),
        }
    }
}

/// Punch in/out: photos, an optional clip, then hand-off
pub struct PunchFlow {
    direction: PunchDirection,
    vehicle_id: String,
    photos: PhotoStep,
    video: VideoStep,
    uploader: Arc<dyn UploadCollaborator>,
    min_photos: usize,
    uploaded_photos: Option<usize>,
    events: EventSink,
}

impl PunchFlow {
    /// Create a flow around its engines
    pub fn new(
        direction: PunchDirection,
        vehicle_id: impl Into<String>,
        camera: CameraCapture,
        recorder: VideoRecorder,
        uploader: Arc<dyn UploadCollaborator>,
        min_photos: usize,
    ) -> Self {
        let events = EventSink::default();
        Self {
            direction,
            vehicle_id: vehicle_id.into(),
            photos: PhotoStep::new(camera, events.clone()),
            video: VideoStep::new(recorder, events.clone()),
            uploader,
            min_photos,
            uploaded_photos: None,
            events,
        }
    }

    /// Receive this flow's events; replaces any earlier stream
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Punch direction
    pub fn direction(&self) -> PunchDirection {
        self.direction
    }

    /// Vehicle being punched in or out
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Photo step
    pub fn photos(&mut self) -> &mut PhotoStep {
        &mut self.photos
    }

    /// Video step
    pub fn video(&mut self) -> &mut VideoStep {
        &mut self.video
    }

    /// Folder this punch's artifacts belong under
    pub fn storage_folder(&self, at: DateTime<Utc>) -> String {
        inspection_folder(&self.vehicle_id, self.direction.kind(), at)
    }

    /// Hand photos, then the clip if one was recorded, to the uploader
    ///
    /// Photos already handed off are not uploaded again when a failed clip
    /// upload is retried; photos taken since then are handed off with the
    /// retry.
    pub async fn submit(&mut self, on_progress: Option<ProgressCallback>) -> UserNotice {
        if self.video.recorder().state() == RecordingState::Recording {
            return self
                .events
                .notify(UserNotice::warning("Stop the recording before submitting."));
        }

        let uploaded = self.uploaded_photos.unwrap_or(0);
        let pending = self.photos.images().len();
        if uploaded + pending < self.min_photos {
            return self.events.notify(UserNotice::warning(format!(
                "Take at least {} photo(s) before punching {}.",
                self.min_photos, self.direction
            )));
        }
        if pending > 0 {
            if let Err(e) = self.photos.hand_off(self.uploader.as_ref(), on_progress).await {
                return self.photos.failed(&e);
            }
        }
        let photos = uploaded + pending;
        self.uploaded_photos = Some(photos);

        let with_video = self.video.has_clip();
        if with_video {
            if let Err(e) = self.video.recorder.hand_off(self.uploader.as_ref()).await {
                return self.video.failed(&e);
            }
        }

        self.photos.stop();
        self.uploaded_photos = None;
        info!(direction = %self.direction, photos, with_video, "Punch submitted");
        self.events.emit(FlowEvent::Submitted {
            kind: self.direction.kind(),
            photos,
            with_video,
        });
        self.events
            .notify(UserNotice::success(format!("Punched {}", self.direction)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_from_media_error() {
        let full = UserNotice::from(&MediaError::ImageSetFull { max: 6 });
        assert_eq!(full.level, NoticeLevel::Warning);
        assert!(full.message.contains('6'));

        let upload = UserNotice::from(&MediaError::Upload {
            message: "timeout".to_string(),
        });
        assert!(upload.is_error());
        assert_eq!(upload.to_string(), "Upload failed: timeout");
    }

    #[test]
    fn test_punch_direction() {
        assert_eq!(PunchDirection::In.kind(), InspectionKind::PunchIn);
        assert_eq!(PunchDirection::Out.to_string(), "out");
    }
}
