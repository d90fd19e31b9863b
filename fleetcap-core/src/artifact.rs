//! Encoded capture artifacts handed from the capture engines to collaborators

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Encoded image container formats produced by the capture engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossless PNG, used for signatures
    Png,
    /// Lossy JPEG, used for inspection photos
    Jpeg,
}

impl ImageFormat {
    /// MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// A still image encoded in memory
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    /// Encoded payload
    pub data: Bytes,
    /// Container format of `data`
    pub format: ImageFormat,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Encode quality in `0.0..=1.0` for lossy formats
    pub quality: Option<f32>,
    /// When the image was produced
    pub captured_at: DateTime<Utc>,
}

impl EncodedImage {
    /// Wrap an encoded payload, stamping it with the current time
    pub fn new(data: impl Into<Bytes>, format: ImageFormat, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            format,
            width,
            height,
            quality: None,
            captured_at: Utc::now(),
        }
    }

    /// Attach the quality the payload was encoded at
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Encoded size in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// `data:` URL suitable for previews
    pub fn data_url(&self) -> String {
        data_url(self.format.mime_type(), &self.data)
    }
}

/// A finalized video recording
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    /// Unique clip identifier
    pub id: Uuid,
    /// Concatenated encoder output
    pub data: Bytes,
    /// Container MIME type, e.g. `video/webm`
    pub mime_type: String,
    /// Recorded duration in whole seconds
    pub duration_secs: u32,
    /// When recording finished
    pub captured_at: DateTime<Utc>,
}

impl VideoClip {
    /// Recorded duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// Encoded size in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Playable `data:` URL for the clip
    pub fn data_url(&self) -> String {
        data_url(&self.mime_type, &self.data)
    }
}

fn data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}
