//! Upload collaborator contract
//!
//! The capture engines never talk to the network. A completed image set or
//! video clip is handed to an [`UploadCollaborator`], which performs the
//! transfer and reports progress through [`UploadProgress`].

use crate::artifact::{EncodedImage, VideoClip};
use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Callback invoked with each new progress percentage
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Progress reporter handed to the upload collaborator
///
/// Percentages are clamped to 100 and regressions are dropped, so the
/// callback only ever observes a strictly increasing sequence.
#[derive(Clone, Default)]
pub struct UploadProgress {
    last: Arc<AtomicU8>,
    callback: Option<ProgressCallback>,
}

impl UploadProgress {
    /// Progress reporter forwarding to `callback`
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            last: Arc::new(AtomicU8::new(0)),
            callback: Some(callback),
        }
    }

    /// Progress reporter that only tracks the latest value
    pub fn silent() -> Self {
        Self::default()
    }

    /// Report a new percentage
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            if let Some(callback) = &self.callback {
                callback(percent);
            }
        }
    }

    /// Highest percentage reported so far
    pub fn current(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    /// Whether the collaborator reported completion
    pub fn is_complete(&self) -> bool {
        self.current() >= 100
    }
}

impl std::fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadProgress")
            .field("current", &self.current())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Image set hand-off payload
#[derive(Debug, Clone)]
pub struct ImageUploadRequest {
    /// Images in capture order
    pub images: Vec<EncodedImage>,
    /// Hand-off time
    pub timestamp: DateTime<Utc>,
    /// Progress sink the collaborator reports into
    pub upload_progress: UploadProgress,
}

/// Video hand-off payload
#[derive(Debug, Clone)]
pub struct VideoUploadRequest {
    /// Encoded clip
    pub blob: Bytes,
    /// Container MIME type
    pub mime_type: String,
    /// Playable URL derived from the clip
    pub data_url: String,
    /// Recorded duration in seconds
    pub duration: u32,
    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl VideoUploadRequest {
    /// Build a request from a finalized clip
    pub fn from_clip(clip: &VideoClip) -> Self {
        Self {
            blob: clip.data.clone(),
            mime_type: clip.mime_type.clone(),
            data_url: clip.data_url(),
            duration: clip.duration_secs,
            timestamp: clip.captured_at,
        }
    }
}

/// Collaborator acknowledgement of a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Storage locations of the uploaded artifacts, in request order
    pub locations: Vec<String>,
}

/// External collaborator performing the actual network upload
#[async_trait]
pub trait UploadCollaborator: Send + Sync {
    /// Upload an inspection image set
    async fn upload_images(&self, request: ImageUploadRequest) -> CoreResult<UploadReceipt>;

    /// Upload a recorded clip
    async fn upload_video(&self, request: VideoUploadRequest) -> CoreResult<UploadReceipt>;
}

/// In-memory collaborator that keeps every request it accepts
///
/// Used by demos and tests in place of the hosted storage backend.
#[derive(Debug, Default)]
pub struct MemoryUploader {
    folder: String,
    failure: Mutex<Option<String>>,
    images: Mutex<Vec<Vec<EncodedImage>>>,
    videos: Mutex<Vec<VideoUploadRequest>>,
}

impl MemoryUploader {
    /// Uploader storing under `folder`
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    /// Make every following upload fail with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Let following uploads succeed again
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Image batches accepted so far
    pub fn image_batches(&self) -> Vec<Vec<EncodedImage>> {
        self.images.lock().clone()
    }

    /// Video requests accepted so far
    pub fn videos(&self) -> Vec<VideoUploadRequest> {
        self.videos.lock().clone()
    }

    fn check_failure(&self) -> CoreResult<()> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(CoreError::upload(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UploadCollaborator for MemoryUploader {
    async fn upload_images(&self, request: ImageUploadRequest) -> CoreResult<UploadReceipt> {
        self.check_failure()?;

        let total = request.images.len().max(1);
        let mut locations = Vec::with_capacity(request.images.len());
        for (index, image) in request.images.iter().enumerate() {
            locations.push(format!(
                "{}/{}_{}.{}",
                self.folder,
                request.timestamp.timestamp_millis(),
                index,
                image.format.extension()
            ));
            request
                .upload_progress
                .report((((index + 1) * 100) / total) as u8);
        }
        request.upload_progress.report(100);

        tracing::debug!(count = locations.len(), folder = %self.folder, "Stored image batch");
        self.images.lock().push(request.images);
        Ok(UploadReceipt { locations })
    }

    async fn upload_video(&self, request: VideoUploadRequest) -> CoreResult<UploadReceipt> {
        self.check_failure()?;

        let location = format!(
            "{}/video_{}.webm",
            self.folder,
            request.timestamp.timestamp_millis()
        );
        tracing::debug!(bytes = request.blob.len(), %location, "Stored video clip");
        self.videos.lock().push(request);
        Ok(UploadReceipt {
            locations: vec![location],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ImageFormat;

    #[test]
    fn test_progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = UploadProgress::new(Arc::new(move |p| sink.lock().push(p)));

        progress.report(10);
        progress.report(5);
        progress.report(10);
        progress.report(60);
        progress.report(250);

        assert_eq!(*seen.lock(), vec![10, 60, 100]);
        assert!(progress.is_complete());
    }

    #[tokio::test]
    async fn test_memory_uploader_reports_completion() {
        let uploader = MemoryUploader::new("inspections/truck-7");
        let progress = UploadProgress::silent();
        let request = ImageUploadRequest {
            images: vec![
                EncodedImage::new(vec![0u8; 4], ImageFormat::Jpeg, 2, 2),
                EncodedImage::new(vec![0u8; 4], ImageFormat::Jpeg, 2, 2),
            ],
            timestamp: Utc::now(),
            upload_progress: progress.clone(),
        };

        let receipt = uploader.upload_images(request).await.unwrap();
        assert_eq!(receipt.locations.len(), 2);
        assert!(receipt.locations[0].starts_with("inspections/truck-7/"));
        assert_eq!(progress.current(), 100);
        assert_eq!(uploader.image_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_uploader_failure() {
        let uploader = MemoryUploader::new("x");
        uploader.fail_with("quota exceeded");
        let request = ImageUploadRequest {
            images: Vec::new(),
            timestamp: Utc::now(),
            upload_progress: UploadProgress::silent(),
        };

        let error = uploader.upload_images(request).await.unwrap_err();
        assert_eq!(error.message(), "quota exceeded");
        assert!(uploader.image_batches().is_empty());
    }
}
