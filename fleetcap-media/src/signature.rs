//! Signature capture
//!
//! A [`SignaturePad`] turns pointer and touch drags on a drawing surface
//! into black 2px strokes on an RGBA raster, answers whether anything was
//! drawn, and exports the drawing as PNG.
//!
//! The pad never fails on an unsized surface: if the raster is 0×0 when it
//! is queried, it is sized from the host first (falling back to 300×150) and
//! reported as empty.

use crate::error::{MediaError, MediaResult};
use fleetcap_core::{EncodedImage, ImageFormat};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Signature surface settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Width used when the host reports a zero size
    pub fallback_width: u32,
    /// Height used when the host reports a zero size
    pub fallback_height: u32,
    /// Stroke width in pixels
    pub stroke_width: u32,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            fallback_width: 300,
            fallback_height: 150,
            stroke_width: 2,
        }
    }
}

impl SignatureConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Fallback surface size must be > 0".to_string(),
            });
        }
        if self.stroke_width == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Stroke width must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Element the pad draws on, as seen by the pad
pub trait SurfaceHost: Send + Sync {
    /// Current on-screen size; `(0, 0)` before layout has completed
    fn display_size(&self) -> (u32, u32);
}

/// Host with a fixed size, for headless use and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedSurface {
    pub width: u32,
    pub height: u32,
}

impl SurfaceHost for FixedSurface {
    fn display_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Position on the surface, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Input events forwarded by the host element
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    PointerLeave,
    /// Touch start with the active touch points
    TouchStart(Vec<Point>),
    TouchMove(Vec<Point>),
    TouchEnd,
}

/// Whether the pad holds ink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    Empty,
    HasInk,
}

/// RGBA pixel buffer the strokes land on
#[derive(Debug, Clone)]
pub struct DrawSurface {
    buffer: RgbaImage,
}

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

impl DrawSurface {
    /// Fully transparent surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn is_unsized(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when every pixel's alpha is zero
    pub fn is_blank(&self) -> bool {
        self.buffer.pixels().all(|pixel| pixel[3] == 0)
    }

    /// Reset every pixel to transparent
    pub fn clear(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Reallocate to `width`×`height`, keeping the overlapping top-left ink
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width(), self.height()) {
            return;
        }
        let mut resized = RgbaImage::new(width, height);
        for y in 0..height.min(self.height()) {
            for x in 0..width.min(self.width()) {
                resized.put_pixel(x, y, *self.buffer.get_pixel(x, y));
            }
        }
        self.buffer = resized;
    }

    /// Stroke a segment with a square brush; returns whether any pixel was inked
    pub fn stroke(&mut self, from: Point, to: Point, width: u32) -> bool {
        if from == to || self.is_unsized() {
            return false;
        }

        // Brush stamps further out than half a width cannot touch the raster
        let half = width as f32 / 2.0;
        let max = Point::new(self.width() as f32 + half, self.height() as f32 + half);
        let (from, to) = match clip_segment(from, to, Point::new(-half, -half), max) {
            Some(segment) => segment,
            None => return false,
        };

        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let length = (dx * dx + dy * dy).sqrt();
        let steps = ((length * 2.0).ceil() as u32).max(1);
        let mut inked = false;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let (cx, cy) = (from.x + dx * t, from.y + dy * t);
            inked |= self.stamp(cx, cy, half);
        }
        inked
    }

    fn stamp(&mut self, cx: f32, cy: f32, half: f32) -> bool {
        let x0 = ((cx - half).floor() as i64).max(0);
        let y0 = ((cy - half).floor() as i64).max(0);
        let x1 = ((cx + half).ceil() as i64).min(i64::from(self.width()));
        let y1 = ((cy + half).ceil() as i64).min(i64::from(self.height()));

        let mut inked = false;
        for y in y0..y1 {
            for x in x0..x1 {
                self.buffer.put_pixel(x as u32, y as u32, INK);
                inked = true;
            }
        }
        inked
    }

    /// Encode the surface as PNG
    pub fn to_png(&self) -> MediaResult<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(
                self.buffer.as_raw(),
                self.width(),
                self.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| MediaError::capture(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer)
    }
}

/// Clip a segment to an axis-aligned box (Liang-Barsky); `None` when it misses
fn clip_segment(from: Point, to: Point, min: Point, max: Point) -> Option<(Point, Point)> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    let edges = [
        (-dx, from.x - min.x),
        (dx, max.x - from.x),
        (-dy, from.y - min.y),
        (dy, max.y - from.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        Point::new(from.x + dx * t0, from.y + dy * t0),
        Point::new(from.x + dx * t1, from.y + dy * t1),
    ))
}

/// Signature capture engine bound to one host element
pub struct SignaturePad {
    host: Box<dyn SurfaceHost>,
    config: SignatureConfig,
    surface: DrawSurface,
    last_point: Option<Point>,
    state: SignatureState,
}

impl SignaturePad {
    /// Bind to `host` and size the raster to its current display size
    pub fn initialize(host: Box<dyn SurfaceHost>, config: SignatureConfig) -> MediaResult<Self> {
        config.validate()?;
        let mut pad = Self::deferred(host, config);
        pad.ensure_sized();
        Ok(pad)
    }

    /// Bind to `host` without sizing; the raster is sized on first use
    pub fn deferred(host: Box<dyn SurfaceHost>, config: SignatureConfig) -> Self {
        Self {
            host,
            config,
            surface: DrawSurface::new(0, 0),
            last_point: None,
            state: SignatureState::Empty,
        }
    }

    pub fn state(&self) -> SignatureState {
        self.state
    }

    /// Current raster dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }

    /// Forward one host input event
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::PointerDown(point) => self.begin_stroke(point),
            SurfaceEvent::TouchStart(touches) => {
                if let Some(point) = touches.first() {
                    self.begin_stroke(*point);
                }
            }
            SurfaceEvent::PointerMove(point) => self.continue_stroke(point),
            SurfaceEvent::TouchMove(touches) => {
                if let Some(point) = touches.first() {
                    self.continue_stroke(*point);
                }
            }
            SurfaceEvent::PointerUp | SurfaceEvent::PointerLeave | SurfaceEvent::TouchEnd => {
                self.last_point = None;
            }
        }
    }

    fn begin_stroke(&mut self, point: Point) {
        self.ensure_sized();
        self.last_point = Some(point);
    }

    fn continue_stroke(&mut self, point: Point) {
        if let Some(previous) = self.last_point {
            self.draw(previous, point);
            self.last_point = Some(point);
        }
    }

    /// Stroke a black line from `from` to `to`
    pub fn draw(&mut self, from: Point, to: Point) {
        self.ensure_sized();
        if self.surface.stroke(from, to, self.config.stroke_width) {
            self.state = SignatureState::HasInk;
        }
    }

    /// Re-read the host size after the element was resized
    pub fn handle_resize(&mut self) {
        let (width, height) = self.host_size();
        if (width, height) == self.dimensions() {
            return;
        }
        debug!(width, height, "Resizing signature surface");
        self.surface.resize(width, height);
        if self.state == SignatureState::HasInk && self.surface.is_blank() {
            self.state = SignatureState::Empty;
        }
    }

    /// Whether every pixel is transparent
    pub fn is_empty(&mut self) -> bool {
        self.ensure_sized();
        self.surface.is_blank()
    }

    /// Erase all ink, keeping the dimensions
    pub fn clear(&mut self) {
        self.surface.clear();
        self.last_point = None;
        self.state = SignatureState::Empty;
    }

    /// Export the drawing as PNG
    pub fn export_image(&mut self) -> MediaResult<EncodedImage> {
        self.ensure_sized();
        let data = self.surface.to_png()?;
        Ok(EncodedImage::new(
            data,
            ImageFormat::Png,
            self.surface.width(),
            self.surface.height(),
        ))
    }

    fn host_size(&self) -> (u32, u32) {
        match self.host.display_size() {
            (width, height) if width > 0 && height > 0 => (width, height),
            _ => (self.config.fallback_width, self.config.fallback_height),
        }
    }

    fn ensure_sized(&mut self) {
        if self.surface.is_unsized() {
            let (width, height) = self.host_size();
            debug!(width, height, "Sizing signature surface");
            self.surface.resize(width, height);
        }
    }
}
