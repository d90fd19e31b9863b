//! Client-side image compression
//!
//! Captured frames are scaled down to a maximum width and re-encoded as JPEG
//! along a decreasing quality ladder until the payload fits the size budget
//! or the quality floor is reached. Ending above the budget at the floor is
//! an accepted outcome, reported through [`CompressionOutcome::within_budget`].

use crate::error::{MediaError, MediaResult};
use fleetcap_core::{EncodedImage, ImageFormat};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Compression settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// First rung of the quality ladder
    pub initial_quality: f32,
    /// Images wider than this are scaled down, preserving aspect ratio
    pub max_width: u32,
    /// Size budget in bytes
    pub target_bytes: usize,
    /// Lowest quality the ladder descends to
    pub quality_floor: f32,
    /// Quality decrement per rung
    pub quality_step: f32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            initial_quality: 0.6,
            max_width: 800,
            target_bytes: 500 * 1024,
            quality_floor: 0.3,
            quality_step: 0.1,
        }
    }
}

impl CompressionConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        let in_range = |q: f32| q > 0.0 && q <= 1.0;
        if !in_range(self.initial_quality) || !in_range(self.quality_floor) {
            return Err(MediaError::InvalidConfiguration {
                message: "Qualities must be within (0, 1]".to_string(),
            });
        }
        if self.quality_floor > self.initial_quality {
            return Err(MediaError::InvalidConfiguration {
                message: "Quality floor above initial quality".to_string(),
            });
        }
        if quality_percent(self.quality_step) == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Quality step must be at least 0.01".to_string(),
            });
        }
        if self.max_width == 0 || self.target_bytes == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Max width and target size must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Qualities tried in order, as JPEG percentages
    ///
    /// Each rung is one step below the previous while the previous is still
    /// above the floor, e.g. 60, 50, 40, 30 for the defaults.
    pub fn quality_ladder(&self) -> Vec<u8> {
        let floor = quality_percent(self.quality_floor);
        let step = quality_percent(self.quality_step).max(1);
        let mut quality = quality_percent(self.initial_quality).max(1);

        let mut ladder = vec![quality];
        while quality > floor && quality > step {
            quality -= step;
            ladder.push(quality);
        }
        ladder
    }
}

fn quality_percent(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// JPEG encoder seam used by the quality ladder
pub trait ImageEncoder: Send + Sync {
    /// Encode `image` as JPEG at `quality` percent
    fn encode_jpeg(&self, image: &RgbImage, quality: u8) -> MediaResult<Vec<u8>>;
}

/// [`ImageEncoder`] backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegImageEncoder;

impl ImageEncoder for JpegImageEncoder {
    fn encode_jpeg(&self, image: &RgbImage, quality: u8) -> MediaResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| MediaError::capture(format!("JPEG encoding failed: {}", e)))?;
        Ok(buffer)
    }
}

/// Result of one compression run
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// Final encoded image
    pub image: EncodedImage,
    /// Quality of the final encode, in `0.0..=1.0`
    pub quality: f32,
    /// Number of encodes performed
    pub attempts: u32,
    /// Estimated size of the final payload
    pub estimated_bytes: usize,
    /// Whether the final payload fits the budget
    pub within_budget: bool,
}

/// Scale `image` down to `max_width`, preserving aspect ratio
pub fn scale_to_width(image: &DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= max_width || width == 0 {
        return image.clone();
    }

    let ratio = f64::from(max_width) / f64::from(width);
    let scaled_height = (f64::from(height) * ratio).round().max(1.0) as u32;
    image.resize_exact(max_width, scaled_height, FilterType::Triangle)
}

/// Decode an encoded still image
pub fn decode_image(data: &[u8]) -> MediaResult<DynamicImage> {
    image::load_from_memory(data).map_err(|e| MediaError::capture(format!("Decode failed: {}", e)))
}

/// Compress `source` with the default JPEG encoder
pub fn compress(source: &DynamicImage, config: &CompressionConfig) -> MediaResult<CompressionOutcome> {
    compress_with(&JpegImageEncoder, source, config)
}

/// Compress `source` along the quality ladder using `encoder`
pub fn compress_with(
    encoder: &dyn ImageEncoder,
    source: &DynamicImage,
    config: &CompressionConfig,
) -> MediaResult<CompressionOutcome> {
    config.validate()?;
    if source.width() == 0 || source.height() == 0 {
        return Err(MediaError::capture("Source image has no pixels"));
    }

    let scaled = scale_to_width(source, config.max_width);
    let rgb = scaled.to_rgb8();

    let mut attempts = 0;
    let mut last: Option<(u8, Vec<u8>)> = None;
    for quality in config.quality_ladder() {
        attempts += 1;
        let data = encoder.encode_jpeg(&rgb, quality)?;
        let size = data.len();
        debug!(quality, size, attempts, "Encoded compression candidate");

        let fits = size <= config.target_bytes;
        last = Some((quality, data));
        if fits {
            break;
        }
    }

    let (quality, data) =
        last.ok_or_else(|| MediaError::capture("Quality ladder produced no candidates"))?;
    let estimated_bytes = data.len();
    let quality = f32::from(quality) / 100.0;
    let within_budget = estimated_bytes <= config.target_bytes;
    if !within_budget {
        debug!(
            estimated_bytes,
            target = config.target_bytes,
            "Quality floor reached above size budget"
        );
    }

    Ok(CompressionOutcome {
        image: EncodedImage::new(data, ImageFormat::Jpeg, rgb.width(), rgb.height())
            .with_quality(quality),
        quality,
        attempts,
        estimated_bytes,
        within_budget,
    })
}
