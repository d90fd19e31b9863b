//! Deterministic media devices for tests, demos and headless hosts

use super::{
    DeviceError, FacingMode, MediaConstraints, MediaDevices, MediaStream, MediaTrack,
    StreamEncoder, TrackCapabilities,
};
use crate::tracks::{EncodedChunk, TrackKind, VideoFrame};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Mock device behaviour, adjustable while streams are open
#[derive(Debug, Clone)]
struct MockBehavior {
    available: HashSet<FacingMode>,
    permission_denied: bool,
    torch: bool,
    torch_fails: bool,
    frame_width: u32,
    frame_height: u32,
    chunk_size: usize,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            available: [FacingMode::User, FacingMode::Environment]
                .into_iter()
                .collect(),
            permission_denied: false,
            torch: true,
            torch_fails: false,
            frame_width: 1280,
            frame_height: 720,
            chunk_size: 1024,
        }
    }
}

#[derive(Debug, Default)]
struct MockRegistry {
    tracks: Vec<Arc<MockTrack>>,
    requests: Vec<MediaConstraints>,
    live_at_request: Vec<usize>,
}

/// Mock implementation of [`MediaDevices`]
///
/// Clones share state, so a test can keep a handle to inspect track
/// lifetimes after moving another handle into an engine.
#[derive(Debug, Clone, Default)]
pub struct MockMediaDevices {
    behavior: Arc<Mutex<MockBehavior>>,
    registry: Arc<Mutex<MockRegistry>>,
    next_id: Arc<AtomicU64>,
}

impl MockMediaDevices {
    /// Both cameras and a microphone, torch supported
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny every following request
    pub fn deny_permission(&self, denied: bool) {
        self.behavior.lock().permission_denied = denied;
    }

    /// Make `facing` (un)available for following requests
    pub fn set_available(&self, facing: FacingMode, available: bool) {
        let mut behavior = self.behavior.lock();
        if available {
            behavior.available.insert(facing);
        } else {
            behavior.available.remove(&facing);
        }
    }

    /// Whether new video tracks report torch support
    pub fn set_torch_supported(&self, supported: bool) {
        self.behavior.lock().torch = supported;
    }

    /// Make torch constraint application fail
    pub fn set_torch_fails(&self, fails: bool) {
        self.behavior.lock().torch_fails = fails;
    }

    /// Native resolution of grabbed frames
    pub fn set_frame_size(&self, width: u32, height: u32) {
        let mut behavior = self.behavior.lock();
        behavior.frame_width = width;
        behavior.frame_height = height;
    }

    /// Number of tracks still holding hardware
    pub fn live_tracks(&self) -> usize {
        self.registry
            .lock()
            .tracks
            .iter()
            .filter(|track| track.is_live())
            .count()
    }

    /// Number of tracks ever handed out
    pub fn tracks_created(&self) -> usize {
        self.registry.lock().tracks.len()
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<MediaConstraints> {
        self.registry.lock().requests.clone()
    }

    /// Live track count observed when each request arrived
    pub fn live_tracks_at_requests(&self) -> Vec<usize> {
        self.registry.lock().live_at_request.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError> {
        {
            let live = self.live_tracks();
            let mut registry = self.registry.lock();
            registry.requests.push(constraints);
            registry.live_at_request.push(live);
        }

        let behavior = self.behavior.lock().clone();
        if behavior.permission_denied {
            return Err(DeviceError::PermissionDenied {
                operation: "getUserMedia".to_string(),
            });
        }

        let video = constraints.video.ok_or_else(|| DeviceError::NotFound {
            device: "video input".to_string(),
        })?;
        if !behavior.available.contains(&video.facing_mode) {
            return Err(DeviceError::NotFound {
                device: format!("{} camera", video.facing_mode),
            });
        }

        let mut tracks = vec![Arc::new(MockTrack {
            id: self.next_id("video"),
            kind: TrackKind::Video,
            live: AtomicBool::new(true),
            torch: behavior.torch,
            behavior: self.behavior.clone(),
        })];
        if constraints.audio {
            tracks.push(Arc::new(MockTrack {
                id: self.next_id("audio"),
                kind: TrackKind::Audio,
                live: AtomicBool::new(true),
                torch: false,
                behavior: self.behavior.clone(),
            }));
        }
        self.registry.lock().tracks.extend(tracks.iter().cloned());

        Ok(Box::new(MockStream {
            id: self.next_id("stream"),
            facing_mode: video.facing_mode,
            tracks,
            behavior: self.behavior.clone(),
        }))
    }
}

/// Mock track
#[derive(Debug)]
pub struct MockTrack {
    id: String,
    kind: TrackKind,
    live: AtomicBool,
    torch: bool,
    behavior: Arc<Mutex<MockBehavior>>,
}

#[async_trait]
impl MediaTrack for MockTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities { torch: self.torch }
    }

    async fn apply_torch(&self, _on: bool) -> Result<(), DeviceError> {
        if !self.is_live() {
            return Err(DeviceError::ConstraintRejected {
                reason: "track ended".to_string(),
            });
        }
        if self.behavior.lock().torch_fails {
            return Err(DeviceError::ConstraintRejected {
                reason: "torch not supported in current mode".to_string(),
            });
        }
        Ok(())
    }
}

struct MockStream {
    id: String,
    facing_mode: FacingMode,
    tracks: Vec<Arc<MockTrack>>,
    behavior: Arc<Mutex<MockBehavior>>,
}

impl MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| track.clone() as Arc<dyn MediaTrack>)
            .collect()
    }

    fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    fn grab_frame(&self) -> Result<VideoFrame, DeviceError> {
        if !self.tracks.iter().any(|track| track.is_live()) {
            return Err(DeviceError::FrameUnavailable {
                reason: "stream stopped".to_string(),
            });
        }

        let (width, height) = {
            let behavior = self.behavior.lock();
            (behavior.frame_width, behavior.frame_height)
        };
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y) % 256) as u8);
                data.push(255);
            }
        }

        Ok(VideoFrame {
            width,
            height,
            data,
            timestamp: 0,
        })
    }

    fn record(&self) -> Result<Box<dyn StreamEncoder>, DeviceError> {
        Ok(Box::new(MockEncoder {
            chunk_size: self.behavior.lock().chunk_size,
            started: false,
            sequence: 0,
        }))
    }
}

struct MockEncoder {
    chunk_size: usize,
    started: bool,
    sequence: u64,
}

impl MockEncoder {
    fn chunk(&mut self) -> EncodedChunk {
        self.sequence += 1;
        EncodedChunk {
            data: Bytes::from(vec![(self.sequence % 256) as u8; self.chunk_size]),
            timestamp: self.sequence * 1000,
        }
    }
}

impl StreamEncoder for MockEncoder {
    fn mime_type(&self) -> &str {
        "video/webm"
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        self.started = true;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<EncodedChunk> {
        if !self.started {
            return Vec::new();
        }
        vec![self.chunk()]
    }

    fn stop(&mut self) -> Result<Vec<EncodedChunk>, DeviceError> {
        if !self.started {
            return Err(DeviceError::Encoder {
                reason: "encoder was never started".to_string(),
            });
        }
        self.started = false;
        Ok(vec![self.chunk()])
    }
}
