//! Bounded-duration video capture
//!
//! A [`VideoRecorder`] records one clip at a time from the rear camera and
//! microphone. A one-second ticker advances the elapsed time and stops the
//! recording when the configured maximum is reached; a manual stop cancels
//! the ticker. Either way the encoder is finalized, the stream released and
//! the buffered chunks concatenated into one [`VideoClip`].

use crate::capture::{ActiveStream, FacingMode, MediaConstraints, MediaDevices, StreamEncoder, VideoResolution};
use crate::error::{MediaError, MediaResult};
use crate::tracks::EncodedChunk;
use bytes::BytesMut;
use chrono::Utc;
use fleetcap_core::{UploadCollaborator, UploadReceipt, VideoClip, VideoUploadRequest};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Video capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Hard recording cap in seconds
    pub max_duration_secs: u32,
    /// Camera to record from
    pub facing: FacingMode,
    /// Record the microphone too
    pub audio: bool,
    /// Preferred stream resolution
    pub ideal_resolution: VideoResolution,
    /// Ticker period in milliseconds; one tick is one elapsed second
    pub tick_interval_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 15,
            facing: FacingMode::Environment,
            audio: true,
            ideal_resolution: VideoResolution::HD,
            tick_interval_ms: 1000,
        }
    }
}

impl VideoConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.max_duration_secs == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Max duration must be > 0".to_string(),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Tick interval must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    /// A clip is ready for hand-off
    Finalized,
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    TimeLimit,
}

/// Video capture events
#[derive(Debug, Clone)]
pub enum VideoCaptureEvent {
    RecordingStarted { max_duration_secs: u32 },
    RecordingTick { elapsed_secs: u32, remaining_secs: u32 },
    RecordingStopped { reason: StopReason, elapsed_secs: u32 },
    ClipFinalized { bytes: usize, duration_secs: u32 },
    RecordingFailed { error: String },
    HandOffCompleted,
    HandOffFailed { error: String },
}

struct RecorderInner {
    state: RecordingState,
    elapsed_secs: u32,
    max_duration_secs: u32,
    stream: Option<ActiveStream>,
    encoder: Option<Box<dyn StreamEncoder>>,
    chunks: Vec<EncodedChunk>,
    clip: Option<VideoClip>,
}

impl RecorderInner {
    fn collect_chunks(&mut self) {
        if let Some(encoder) = self.encoder.as_mut() {
            self.chunks.extend(encoder.take_chunks());
        }
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }

    /// Finalize the encoder, release the stream and assemble the clip
    fn finalize(&mut self, reason: StopReason) -> MediaResult<VideoClip> {
        if self.state != RecordingState::Recording {
            return Err(MediaError::InvalidState {
                message: "Not recording".to_string(),
            });
        }
        self.state = RecordingState::Idle;

        self.collect_chunks();
        let finished = self.encoder.take().map(|mut encoder| {
            let mime_type = encoder.mime_type().to_string();
            encoder.stop().map(|tail| (mime_type, tail))
        });
        self.release_stream();
        info!(?reason, elapsed = self.elapsed_secs, "Recording stopped");

        let (mime_type, tail) = match finished {
            Some(Ok(finished)) => finished,
            Some(Err(e)) => {
                self.chunks.clear();
                return Err(MediaError::capture(format!("Encoder finalization failed: {}", e)));
            }
            None => {
                self.chunks.clear();
                return Err(MediaError::capture("Recording has no encoder"));
            }
        };
        self.chunks.extend(tail);

        let mut data = BytesMut::with_capacity(self.chunks.iter().map(|c| c.data.len()).sum());
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk.data);
        }

        let clip = VideoClip {
            id: Uuid::new_v4(),
            data: data.freeze(),
            mime_type,
            duration_secs: self.elapsed_secs,
            captured_at: Utc::now(),
        };
        self.clip = Some(clip.clone());
        self.state = RecordingState::Finalized;
        Ok(clip)
    }
}

/// Video capture engine
pub struct VideoRecorder {
    devices: Arc<dyn MediaDevices>,
    config: VideoConfig,
    inner: Arc<Mutex<RecorderInner>>,
    ticker: Option<JoinHandle<()>>,
    event_tx: broadcast::Sender<VideoCaptureEvent>,
}

impl VideoRecorder {
    /// Create an idle recorder
    pub fn new(devices: Arc<dyn MediaDevices>, config: VideoConfig) -> MediaResult<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(100);
        let inner = RecorderInner {
            state: RecordingState::Idle,
            elapsed_secs: 0,
            max_duration_secs: config.max_duration_secs,
            stream: None,
            encoder: None,
            chunks: Vec::new(),
            clip: None,
        };

        Ok(Self {
            devices,
            config,
            inner: Arc::new(Mutex::new(inner)),
            ticker: None,
            event_tx,
        })
    }

    pub fn state(&self) -> RecordingState {
        self.inner.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Whole seconds recorded so far, never above the maximum
    pub fn elapsed_secs(&self) -> u32 {
        self.inner.lock().elapsed_secs
    }

    pub fn max_duration_secs(&self) -> u32 {
        self.config.max_duration_secs
    }

    /// Finalized clip awaiting hand-off
    pub fn clip(&self) -> Option<VideoClip> {
        self.inner.lock().clip.clone()
    }

    /// Subscribe to recorder events
    pub fn subscribe_events(&self) -> broadcast::Receiver<VideoCaptureEvent> {
        self.event_tx.subscribe()
    }

    /// Start recording
    pub async fn start_recording(&mut self) -> MediaResult<()> {
        if self.is_recording() {
            return Err(MediaError::InvalidState {
                message: "Already recording".to_string(),
            });
        }

        let constraints = if self.config.audio {
            MediaConstraints::camera_with_audio(self.config.facing, self.config.ideal_resolution)
        } else {
            MediaConstraints::camera(self.config.facing, self.config.ideal_resolution)
        };
        let stream = match self.devices.get_user_media(constraints).await {
            Ok(stream) => ActiveStream::new(stream),
            Err(e) => {
                let error = MediaError::CameraAccess {
                    reason: e.to_string(),
                };
                self.emit(VideoCaptureEvent::RecordingFailed {
                    error: error.to_string(),
                });
                return Err(error);
            }
        };

        // `stream` is dropped, and its tracks stopped, if the encoder fails
        let mut encoder = stream
            .stream()
            .record()
            .map_err(|e| MediaError::capture(format!("Recorder unavailable: {}", e)))?;
        encoder
            .start()
            .map_err(|e| MediaError::capture(format!("Recorder failed to start: {}", e)))?;

        {
            let mut inner = self.inner.lock();
            if inner.clip.take().is_some() {
                warn!("Discarding clip that was never handed off");
            }
            inner.state = RecordingState::Recording;
            inner.elapsed_secs = 0;
            inner.chunks.clear();
            inner.stream = Some(stream);
            inner.encoder = Some(encoder);
        }

        info!(max = self.config.max_duration_secs, "Recording started");
        self.emit(VideoCaptureEvent::RecordingStarted {
            max_duration_secs: self.config.max_duration_secs,
        });
        self.spawn_ticker();
        Ok(())
    }

    fn spawn_ticker(&mut self) {
        if let Some(previous) = self.ticker.take() {
            previous.abort();
        }

        let inner = self.inner.clone();
        let event_tx = self.event_tx.clone();
        let period = Duration::from_millis(self.config.tick_interval_ms);

        self.ticker = Some(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;

                let mut guard = inner.lock();
                if guard.state != RecordingState::Recording {
                    break;
                }
                guard.collect_chunks();
                guard.elapsed_secs = (guard.elapsed_secs + 1).min(guard.max_duration_secs);
                let elapsed_secs = guard.elapsed_secs;
                let remaining_secs = guard.max_duration_secs - elapsed_secs;
                let _ = event_tx.send(VideoCaptureEvent::RecordingTick {
                    elapsed_secs,
                    remaining_secs,
                });

                if remaining_secs == 0 {
                    debug!(elapsed_secs, "Recording reached its time limit");
                    let result = guard.finalize(StopReason::TimeLimit);
                    drop(guard);
                    publish_stop(&event_tx, StopReason::TimeLimit, elapsed_secs, &result);
                    break;
                }
            }
        }));
    }

    /// Stop recording and return the finalized clip
    ///
    /// Stopping after the time limit already stopped the recording returns
    /// the clip produced then.
    pub fn stop_recording(&mut self) -> MediaResult<VideoClip> {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        let mut inner = self.inner.lock();
        match inner.state {
            RecordingState::Recording => {
                let elapsed_secs = inner.elapsed_secs;
                let result = inner.finalize(StopReason::Manual);
                drop(inner);
                publish_stop(&self.event_tx, StopReason::Manual, elapsed_secs, &result);
                result
            }
            RecordingState::Finalized => inner.clip.clone().ok_or_else(|| MediaError::InvalidState {
                message: "Finalized recording has no clip".to_string(),
            }),
            RecordingState::Idle => Err(MediaError::InvalidState {
                message: "Not recording".to_string(),
            }),
        }
    }

    /// Hand the finalized clip to `uploader`
    ///
    /// The recorder returns to idle either way; the clip is kept after a
    /// failure so the upload can be retried without re-recording.
    pub async fn hand_off(&mut self, uploader: &dyn UploadCollaborator) -> MediaResult<UploadReceipt> {
        let clip = self.clip().ok_or_else(|| MediaError::InvalidState {
            message: "No recording to upload".to_string(),
        })?;
        let request = VideoUploadRequest::from_clip(&clip);

        let result = uploader.upload_video(request).await;
        let mut inner = self.inner.lock();
        if inner.state == RecordingState::Finalized {
            inner.state = RecordingState::Idle;
        }
        match result {
            Ok(receipt) => {
                inner.clip = None;
                drop(inner);
                info!(clip_id = %clip.id, "Clip handed off");
                self.emit(VideoCaptureEvent::HandOffCompleted);
                Ok(receipt)
            }
            Err(e) => {
                drop(inner);
                warn!(error = %e, "Clip hand-off failed");
                self.emit(VideoCaptureEvent::HandOffFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn emit(&self, event: VideoCaptureEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn publish_stop(
    event_tx: &broadcast::Sender<VideoCaptureEvent>,
    reason: StopReason,
    elapsed_secs: u32,
    result: &MediaResult<VideoClip>,
) {
    let _ = event_tx.send(VideoCaptureEvent::RecordingStopped {
        reason,
        elapsed_secs,
    });
    let event = match result {
        Ok(clip) => VideoCaptureEvent::ClipFinalized {
            bytes: clip.byte_len(),
            duration_secs: clip.duration_secs,
        },
        Err(e) => VideoCaptureEvent::RecordingFailed {
            error: e.to_string(),
        },
    };
    let _ = event_tx.send(event);
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let mut inner = self.inner.lock();
        inner.encoder = None;
        inner.release_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::MockMediaDevices;

    fn recorder(devices: &MockMediaDevices, max: u32) -> VideoRecorder {
        VideoRecorder::new(
            Arc::new(devices.clone()),
            VideoConfig {
                max_duration_secs: max,
                ..VideoConfig::default()
            },
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_finalizes_clip() {
        let devices = MockMediaDevices::new();
        let mut recorder = recorder(&devices, 15);

        recorder.start_recording().await.unwrap();
        assert_eq!(devices.live_tracks(), 2);
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let clip = recorder.stop_recording().unwrap();
        assert_eq!(clip.duration_secs, 3);
        assert_eq!(clip.mime_type, "video/webm");
        assert!(clip.byte_len() > 0);
        assert_eq!(recorder.state(), RecordingState::Finalized);
        assert_eq!(devices.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_stop_without_recording_is_invalid() {
        let devices = MockMediaDevices::new();
        let mut recorder = recorder(&devices, 5);
        assert!(matches!(
            recorder.stop_recording(),
            Err(MediaError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let devices = MockMediaDevices::new();
        {
            let mut recorder = recorder(&devices, 5);
            recorder.start_recording().await.unwrap();
            assert_eq!(devices.live_tracks(), 2);
        }
        assert_eq!(devices.live_tracks(), 0);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let config = VideoConfig {
            max_duration_secs: 0,
            ..VideoConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
