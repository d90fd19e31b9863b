//! Track kinds and frame types exchanged with the platform layer

use bytes::Bytes;
use image::RgbaImage;

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Camera track
    Video,
    /// Microphone track
    Audio,
}

/// Raw preview frame grabbed from a video track
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 pixels
    pub data: Vec<u8>,
    /// Timestamp in milliseconds
    pub timestamp: u64,
}

impl VideoFrame {
    /// Expected `data` length for the frame's dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Whether the frame has usable dimensions and pixel data
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }

    /// View the frame as an RGBA raster, `None` if the buffer is malformed
    pub fn into_rgba(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }
}

/// One buffered chunk of encoder output
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Encoded bytes
    pub data: Bytes,
    /// Timestamp in milliseconds
    pub timestamp: u64,
}
