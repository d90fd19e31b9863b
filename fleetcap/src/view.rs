//! Presentation adapters
//!
//! One capture engine backs both rendering densities. A host picks a
//! [`CaptureLayout`] and renders the view models built here; nothing in this
//! module touches hardware or mutates engine state.

use fleetcap_core::InspectionView;
use fleetcap_media::{CameraCapture, FacingMode, ImageSet, RecordingState, VideoRecorder};
use serde::{Deserialize, Serialize};

/// Rendering density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureLayout {
    /// Full-page capture with labels and every control
    #[default]
    Full,
    /// Inline capture inside a larger form
    Compact,
}

/// Layout knobs derived from a [`CaptureLayout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Layout these options were derived from
    pub layout: CaptureLayout,
    /// Thumbnail edge length in pixels
    pub thumbnail_size: u32,
    /// Thumbnails per gallery row
    pub gallery_columns: usize,
    /// Render positional labels under thumbnails
    pub show_labels: bool,
    /// Render flip and flash buttons
    pub show_secondary_controls: bool,
}

impl LayoutOptions {
    /// Options for `layout`
    pub fn for_layout(layout: CaptureLayout) -> Self {
        match layout {
            CaptureLayout::Full => Self {
                layout,
                thumbnail_size: 160,
                gallery_columns: 3,
                show_labels: true,
                show_secondary_controls: true,
            },
            CaptureLayout::Compact => Self {
                layout,
                thumbnail_size: 72,
                gallery_columns: 6,
                show_labels: false,
                show_secondary_controls: false,
            },
        }
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::for_layout(CaptureLayout::default())
    }
}

/// One photo in the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryTile {
    /// Position in the set, used for deletion
    pub index: usize,
    /// Positional label
    pub view: InspectionView,
    /// Label text, or `None` when the layout hides labels
    pub caption: Option<String>,
    /// Image source for the thumbnail
    pub data_url: String,
    /// Encoded size in bytes
    pub bytes: usize,
}

/// Gallery of captured photos
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryView {
    /// Tiles in capture order
    pub tiles: Vec<GalleryTile>,
    /// Set capacity
    pub capacity: usize,
    /// Counter text, e.g. `2/6`
    pub counter: String,
    /// Whether the set still has room
    pub can_capture: bool,
    /// Layout the view was built for
    pub options: LayoutOptions,
}

impl GalleryView {
    /// Build from the current set; labels follow current positions
    pub fn build(images: &ImageSet, options: LayoutOptions) -> Self {
        let tiles = images
            .labeled()
            .enumerate()
            .map(|(index, (view, image))| GalleryTile {
                index,
                view,
                caption: options.show_labels.then(|| view.to_string()),
                data_url: image.data_url(),
                bytes: image.byte_len(),
            })
            .collect();

        Self {
            tiles,
            capacity: images.max_images(),
            counter: format!("{}/{}", images.len(), images.max_images()),
            can_capture: !images.is_full(),
            options,
        }
    }

    /// Tiles grouped into rows of `gallery_columns`
    pub fn rows(&self) -> Vec<&[GalleryTile]> {
        self.tiles
            .chunks(self.options.gallery_columns.max(1))
            .collect()
    }
}

/// Camera button states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraControlsView {
    /// Camera is streaming
    pub active: bool,
    /// Current or preferred camera
    pub facing: FacingMode,
    /// Start button enabled
    pub can_start: bool,
    /// Capture button enabled
    pub can_capture: bool,
    /// Capture button text
    pub capture_label: String,
    /// Flip button rendered
    pub show_flip: bool,
    /// Flash button rendered
    pub show_flash: bool,
    /// Torch is on
    pub flash_on: bool,
}

impl CameraControlsView {
    /// Build from engine state
    ///
    /// `busy` is set by the host while a start, flip or hand-off is in
    /// flight; it disables every action.
    pub fn build(camera: &CameraCapture, options: LayoutOptions, busy: bool) -> Self {
        let session = camera.session();
        let images = camera.images();
        let active = session.is_active();

        let capture_label = match options.layout {
            CaptureLayout::Full if images.is_full() => "Photo limit reached".to_string(),
            CaptureLayout::Full => format!(
                "Capture {} ({}/{})",
                InspectionView::from_position(images.len()),
                images.len(),
                images.max_images()
            ),
            CaptureLayout::Compact => format!("{}/{}", images.len(), images.max_images()),
        };

        Self {
            active,
            facing: session.facing_mode(),
            can_start: !active && !busy,
            can_capture: active && !busy && !images.is_full(),
            capture_label,
            show_flip: options.show_secondary_controls && active,
            show_flash: options.show_secondary_controls && active && session.torch_available(),
            flash_on: session.torch_on(),
        }
    }
}

/// Recording timer and button states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingView {
    /// Recorder state
    pub state: RecordingState,
    /// Seconds recorded
    pub elapsed_secs: u32,
    /// Time cap
    pub max_secs: u32,
    /// Elapsed share of the cap, 0-100
    pub progress_percent: u8,
    /// Timer text
    pub timer_label: String,
    /// Start button enabled
    pub can_start: bool,
    /// Stop button enabled
    pub can_stop: bool,
    /// A clip is waiting for hand-off
    pub has_clip: bool,
}

impl RecordingView {
    /// Build from recorder state
    pub fn build(recorder: &VideoRecorder, options: LayoutOptions, busy: bool) -> Self {
        let state = recorder.state();
        let elapsed_secs = recorder.elapsed_secs();
        let max_secs = recorder.max_duration_secs();
        let progress_percent = if max_secs == 0 {
            0
        } else {
            (u64::from(elapsed_secs.min(max_secs)) * 100 / u64::from(max_secs)) as u8
        };

        let timer_label = match options.layout {
            CaptureLayout::Full => format!("{} / {}", clock(elapsed_secs), clock(max_secs)),
            CaptureLayout::Compact => format!("{}s", max_secs.saturating_sub(elapsed_secs)),
        };

        Self {
            state,
            elapsed_secs,
            max_secs,
            progress_percent,
            timer_label,
            can_start: state != RecordingState::Recording && !busy,
            can_stop: state == RecordingState::Recording,
            has_clip: recorder.clip().is_some(),
        }
    }
}

fn clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcap_core::{EncodedImage, ImageFormat};

    fn image_set(count: usize, max: usize) -> ImageSet {
        let mut set = ImageSet::new(max);
        for i in 0..count {
            set.push(EncodedImage::new(vec![i as u8; 4], ImageFormat::Jpeg, 8, 8))
                .unwrap();
        }
        set
    }

    #[test]
    fn test_layout_options() {
        let full = LayoutOptions::for_layout(CaptureLayout::Full);
        let compact = LayoutOptions::for_layout(CaptureLayout::Compact);
        assert!(full.show_labels && full.show_secondary_controls);
        assert!(!compact.show_labels && !compact.show_secondary_controls);
        assert!(compact.thumbnail_size < full.thumbnail_size);
        assert_eq!(LayoutOptions::default(), full);
    }

    #[test]
    fn test_gallery_labels_follow_position() {
        let set = image_set(7, 7);
        let view = GalleryView::build(&set, LayoutOptions::default());

        let captions: Vec<_> = view.tiles.iter().map(|t| t.caption.clone().unwrap()).collect();
        assert_eq!(
            captions,
            vec![
                "Front",
                "Driver Side",
                "Rear",
                "Passenger Side",
                "Interior",
                "View 6",
                "View 7"
            ]
        );
        assert_eq!(view.counter, "7/7");
        assert!(!view.can_capture);
        assert_eq!(view.rows().len(), 3);
    }

    #[test]
    fn test_compact_gallery_hides_captions() {
        let set = image_set(2, 6);
        let view = GalleryView::build(&set, LayoutOptions::for_layout(CaptureLayout::Compact));
        assert!(view.tiles.iter().all(|t| t.caption.is_none()));
        assert_eq!(view.tiles[1].view, InspectionView::DriverSide);
        assert!(view.tiles[0].data_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(view.rows().len(), 1);
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(clock(3), "00:03");
        assert_eq!(clock(75), "01:15");
    }
}
