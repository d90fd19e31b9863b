//! Bounded, ordered collection of captured stills

use crate::error::{MediaError, MediaResult};
use fleetcap_core::{EncodedImage, InspectionView};

/// Default maximum number of inspection photos
pub const DEFAULT_MAX_IMAGES: usize = 6;

/// Captured images in capture order, never longer than `max_images`
#[derive(Debug, Clone)]
pub struct ImageSet {
    images: Vec<EncodedImage>,
    max_images: usize,
}

impl Default for ImageSet {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGES)
    }
}

impl ImageSet {
    /// Empty set holding at most `max_images`
    pub fn new(max_images: usize) -> Self {
        Self {
            images: Vec::with_capacity(max_images),
            max_images,
        }
    }

    /// Append an image, returning its position
    pub fn push(&mut self, image: EncodedImage) -> MediaResult<usize> {
        if self.is_full() {
            return Err(MediaError::ImageSetFull {
                max: self.max_images,
            });
        }
        self.images.push(image);
        Ok(self.images.len() - 1)
    }

    /// Remove the image at `index`; later images shift down one position
    pub fn remove(&mut self, index: usize) -> Option<EncodedImage> {
        if index < self.images.len() {
            Some(self.images.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.images.len() >= self.max_images
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// Slots left before the set is full
    pub fn remaining(&self) -> usize {
        self.max_images.saturating_sub(self.images.len())
    }

    pub fn get(&self, index: usize) -> Option<&EncodedImage> {
        self.images.get(index)
    }

    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }

    /// Label of the image currently at `index`
    pub fn label(&self, index: usize) -> Option<InspectionView> {
        (index < self.images.len()).then(|| InspectionView::from_position(index))
    }

    /// Images paired with labels recomputed from their current positions
    pub fn labeled(&self) -> impl Iterator<Item = (InspectionView, &EncodedImage)> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| (InspectionView::from_position(index), image))
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}
