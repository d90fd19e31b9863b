//! # Fleet Capture Media
//!
//! Capture engines for vehicle inspections: signature pads, camera
//! snapshots with size-budgeted JPEG compression, and bounded video
//! recording. Engines reach hardware only through the [`capture`] traits and
//! hand finished artifacts to the collaborators defined in `fleetcap-core`.

#![warn(clippy::all)]

pub mod camera;
pub mod capture;
pub mod compress;
pub mod error;
pub mod image_set;
pub mod signature;
pub mod tracks;
pub mod video_capture;

// Re-export main types
pub use camera::{
    process_frame, CameraCapture, CameraConfig, CameraEvent, CaptureSession, FlipOutcome,
    ShutterSound,
};
pub use capture::{
    ActiveStream, DeviceError, FacingMode, MediaConstraints, MediaDevices, MediaStream,
    MediaTrack, StreamEncoder, TrackCapabilities, VideoConstraints, VideoResolution,
};
pub use compress::{
    compress, compress_with, decode_image, scale_to_width, CompressionConfig, CompressionOutcome,
    ImageEncoder, JpegImageEncoder,
};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use image_set::{ImageSet, DEFAULT_MAX_IMAGES};
pub use signature::{
    DrawSurface, FixedSurface, Point, SignatureConfig, SignaturePad, SignatureState,
    SurfaceEvent, SurfaceHost,
};
pub use tracks::{EncodedChunk, TrackKind, VideoFrame};
pub use video_capture::{
    RecordingState, StopReason, VideoCaptureEvent, VideoConfig, VideoRecorder,
};
