//! Capture statistics gathered from engine events

use chrono::{DateTime, Utc};
use fleetcap_media::{CameraEvent, FlipOutcome, StopReason, VideoCaptureEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Camera counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraStats {
    /// Photos added to the set
    pub photos_captured: u64,
    /// Photos removed by the user
    pub photos_deleted: u64,
    /// Failed starts and captures
    pub capture_failures: u64,
    /// Photos that stayed above the size budget at the quality floor
    pub over_budget_photos: u64,
    /// Sum of encoded photo sizes
    pub total_photo_bytes: u64,
    /// Sum of final JPEG qualities, for averaging
    pub quality_sum: f64,
    /// Sum of encode attempts, for averaging
    pub encode_attempts: u64,
    /// Successful camera switches
    pub flips: u64,
    /// Switches that fell back to the original camera
    pub flip_reverts: u64,
    /// Torch state changes
    pub torch_toggles: u64,
    /// Photo sets handed off
    pub hand_offs_completed: u64,
    /// Photo set hand-offs that failed
    pub hand_offs_failed: u64,
}

impl CameraStats {
    /// Mean final quality across captured photos
    pub fn average_quality(&self) -> Option<f64> {
        if self.photos_captured == 0 {
            return None;
        }
        Some(self.quality_sum / self.photos_captured as f64)
    }

    /// Mean encoded photo size
    pub fn average_photo_bytes(&self) -> Option<u64> {
        self.total_photo_bytes.checked_div(self.photos_captured)
    }
}

/// Video counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStats {
    /// Recordings started
    pub recordings_started: u64,
    /// Recordings stopped by the user
    pub stopped_manually: u64,
    /// Recordings stopped by the time limit
    pub stopped_at_limit: u64,
    /// Clips successfully finalized
    pub clips_finalized: u64,
    /// Total finalized clip length
    pub total_clip_secs: u64,
    /// Total finalized clip bytes
    pub total_clip_bytes: u64,
    /// Access or encoder failures
    pub recording_failures: u64,
    /// Clips handed off
    pub hand_offs_completed: u64,
    /// Clip hand-offs that failed
    pub hand_offs_failed: u64,
}

/// Snapshot of everything collected so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureStats {
    /// Camera counters
    pub camera: CameraStats,
    /// Video counters
    pub video: VideoStats,
    /// Time of the most recent event
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Aggregates camera and video engine events into [`CaptureStats`]
#[derive(Debug, Clone, Default)]
pub struct CaptureStatsCollector {
    stats: Arc<Mutex<CaptureStats>>,
}

impl CaptureStatsCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one camera event into the counters
    pub fn record_camera_event(&self, event: &CameraEvent) {
        let mut stats = self.stats.lock();
        let camera = &mut stats.camera;
        match event {
            CameraEvent::ImageCaptured {
                bytes,
                quality,
                attempts,
                within_budget,
                ..
            } => {
                camera.photos_captured += 1;
                camera.total_photo_bytes += *bytes as u64;
                camera.quality_sum += f64::from(*quality);
                camera.encode_attempts += u64::from(*attempts);
                if !within_budget {
                    camera.over_budget_photos += 1;
                }
            }
            CameraEvent::ImageDeleted { .. } => camera.photos_deleted += 1,
            CameraEvent::CaptureFailed { .. } => camera.capture_failures += 1,
            CameraEvent::CameraFlipped { outcome } => match outcome {
                FlipOutcome::Switched(_) => camera.flips += 1,
                FlipOutcome::Reverted { .. } => camera.flip_reverts += 1,
            },
            CameraEvent::FlashToggled { .. } => camera.torch_toggles += 1,
            CameraEvent::HandOffCompleted { .. } => camera.hand_offs_completed += 1,
            CameraEvent::HandOffFailed { .. } => camera.hand_offs_failed += 1,
            CameraEvent::CameraStarted { .. } | CameraEvent::CameraStopped => {}
        }
        stats.last_event_at = Some(Utc::now());
    }

    /// Fold one video event into the counters
    pub fn record_video_event(&self, event: &VideoCaptureEvent) {
        let mut stats = self.stats.lock();
        let video = &mut stats.video;
        match event {
            VideoCaptureEvent::RecordingStarted { .. } => video.recordings_started += 1,
            VideoCaptureEvent::RecordingStopped { reason, .. } => match reason {
                StopReason::Manual => video.stopped_manually += 1,
                StopReason::TimeLimit => video.stopped_at_limit += 1,
            },
            VideoCaptureEvent::ClipFinalized {
                bytes,
                duration_secs,
            } => {
                video.clips_finalized += 1;
                video.total_clip_bytes += *bytes as u64;
                video.total_clip_secs += u64::from(*duration_secs);
            }
            VideoCaptureEvent::RecordingFailed { .. } => video.recording_failures += 1,
            VideoCaptureEvent::HandOffCompleted => video.hand_offs_completed += 1,
            VideoCaptureEvent::HandOffFailed { .. } => video.hand_offs_failed += 1,
            VideoCaptureEvent::RecordingTick { .. } => return,
        }
        stats.last_event_at = Some(Utc::now());
    }

    /// Consume a camera event stream until its engine is dropped
    pub fn watch_camera(&self, mut events: broadcast::Receiver<CameraEvent>) -> JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => collector.record_camera_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Camera stats fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Camera event stream closed");
        })
    }

    /// Consume a video event stream until its recorder is dropped
    pub fn watch_video(&self, mut events: broadcast::Receiver<VideoCaptureEvent>) -> JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => collector.record_video_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Video stats fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Video event stream closed");
        })
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> CaptureStats {
        self.stats.lock().clone()
    }

    /// Current counters as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Zero every counter
    pub fn reset(&self) {
        *self.stats.lock() = CaptureStats::default();
    }
}
