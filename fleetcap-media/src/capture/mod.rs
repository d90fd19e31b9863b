//! Platform media device abstraction
//!
//! The capture engines talk to camera and microphone hardware only through
//! the traits in this module. A host binds them to its platform (browser
//! media devices, a native camera API); [`mock::MockMediaDevices`] provides
//! a deterministic implementation for tests and demos.

pub mod mock;

use crate::tracks::{EncodedChunk, TrackKind, VideoFrame};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Which physical camera a stream targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacingMode {
    /// Front-facing camera
    User,
    /// Rear camera
    Environment,
}

impl FacingMode {
    /// The other camera
    pub fn opposite(&self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

impl VideoResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const HD: Self = Self::new(1280, 720);
    pub const VGA: Self = Self::new(640, 480);

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Video part of a stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Requested camera
    pub facing_mode: FacingMode,
    /// Preferred, not mandatory, resolution
    pub ideal_resolution: VideoResolution,
}

/// Stream request passed to [`MediaDevices::get_user_media`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Video request, `None` for audio-only
    pub video: Option<VideoConstraints>,
    /// Whether a microphone track is requested
    pub audio: bool,
}

impl MediaConstraints {
    /// Camera-only request
    pub fn camera(facing_mode: FacingMode, ideal_resolution: VideoResolution) -> Self {
        Self {
            video: Some(VideoConstraints {
                facing_mode,
                ideal_resolution,
            }),
            audio: false,
        }
    }

    /// Camera plus microphone request
    pub fn camera_with_audio(facing_mode: FacingMode, ideal_resolution: VideoResolution) -> Self {
        Self {
            audio: true,
            ..Self::camera(facing_mode, ideal_resolution)
        }
    }
}

/// Capabilities reported by a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackCapabilities {
    /// Track can drive the torch/flash LED
    pub torch: bool,
}

/// Errors reported by the platform layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// User or platform refused access
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// No device satisfies the request
    #[error("Device not found: {device}")]
    NotFound {
        /// Device description
        device: String,
    },

    /// Device exists but cannot be opened, e.g. held by another process
    #[error("Device not readable: {reason}")]
    NotReadable {
        /// Failure reason
        reason: String,
    },

    /// Constraint application was rejected
    #[error("Constraint rejected: {reason}")]
    ConstraintRejected {
        /// Failure reason
        reason: String,
    },

    /// Frame grab failed
    #[error("Frame unavailable: {reason}")]
    FrameUnavailable {
        /// Failure reason
        reason: String,
    },

    /// Stream encoder failed
    #[error("Encoder error: {reason}")]
    Encoder {
        /// Failure reason
        reason: String,
    },
}

/// One track of an acquired stream
#[async_trait]
pub trait MediaTrack: Send + Sync + fmt::Debug {
    /// Track identifier
    fn id(&self) -> &str;

    /// Media kind
    fn kind(&self) -> TrackKind;

    /// Release the underlying hardware; idempotent
    fn stop(&self);

    /// Whether the track still holds its device
    fn is_live(&self) -> bool;

    /// Platform-reported capabilities
    fn capabilities(&self) -> TrackCapabilities;

    /// Apply a torch on/off constraint
    async fn apply_torch(&self, on: bool) -> Result<(), DeviceError>;
}

/// Encoder turning a live stream into container chunks
pub trait StreamEncoder: Send {
    /// Container MIME type of the produced chunks
    fn mime_type(&self) -> &str;

    /// Begin buffering encoder output
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Drain chunks produced since the last call
    fn take_chunks(&mut self) -> Vec<EncodedChunk>;

    /// Finalize and drain the remaining chunks
    fn stop(&mut self) -> Result<Vec<EncodedChunk>, DeviceError>;
}

/// An acquired camera/microphone stream
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// All tracks of the stream
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Camera the stream was opened on
    fn facing_mode(&self) -> FacingMode;

    /// Grab the current preview frame at native resolution
    fn grab_frame(&self) -> Result<VideoFrame, DeviceError>;

    /// Create an encoder recording this stream
    fn record(&self) -> Result<Box<dyn StreamEncoder>, DeviceError>;

    /// First video track, if any
    fn video_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.tracks()
            .into_iter()
            .find(|track| track.kind() == TrackKind::Video)
    }
}

/// Entry point to the platform's media devices
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a stream satisfying `constraints`
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError>;
}

/// Owner of an acquired stream that stops its tracks exactly once
///
/// Tracks are stopped on [`ActiveStream::release`] or, failing that, when the
/// owner is dropped, so every exit path gives the hardware back.
pub struct ActiveStream {
    stream: Box<dyn MediaStream>,
    released: bool,
}

impl ActiveStream {
    /// Take ownership of `stream`
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream,
            released: false,
        }
    }

    /// Borrow the stream
    pub fn stream(&self) -> &dyn MediaStream {
        self.stream.as_ref()
    }

    /// Stop every track now
    pub fn release(mut self) {
        self.stop_tracks();
    }

    fn stop_tracks(&mut self) {
        if self.released {
            return;
        }
        for track in self.stream.tracks() {
            track.stop();
        }
        self.released = true;
        tracing::debug!(stream_id = self.stream.id(), "Released media stream");
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

impl fmt::Debug for ActiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveStream")
            .field("id", &self.stream.id())
            .field("facing_mode", &self.stream.facing_mode())
            .field("released", &self.released)
            .finish()
    }
}
