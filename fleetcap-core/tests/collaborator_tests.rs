//! Integration tests for the upload and storage collaborator contracts

use async_trait::async_trait;
use chrono::Utc;
use fleetcap_core::*;
use std::sync::Arc;

fn jpeg(seed: u8) -> EncodedImage {
    EncodedImage::new(vec![seed; 16], ImageFormat::Jpeg, 4, 4).with_quality(0.6)
}

/// Storage that lists whatever an upload receipt reported under a folder
struct ReceiptStorage {
    folder: String,
    locations: Vec<String>,
}

#[async_trait]
impl StorageCollaborator for ReceiptStorage {
    async fn list(&self, folder: &str) -> CoreResult<Vec<String>> {
        if folder != self.folder {
            return Err(CoreError::storage(format!("no such folder: {}", folder)));
        }
        let prefix = format!("{}/", folder);
        Ok(self
            .locations
            .iter()
            .filter_map(|l| l.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}

// ============================================================================
// UPLOAD TESTS
// ============================================================================

#[tokio::test]
async fn test_failed_upload_stores_nothing() {
    let uploader = MemoryUploader::new("inspections/truck-7");
    uploader.fail_with("network unreachable");

    let progress = UploadProgress::silent();
    let result = uploader
        .upload_images(ImageUploadRequest {
            images: vec![jpeg(1)],
            timestamp: Utc::now(),
            upload_progress: progress.clone(),
        })
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.message(), "network unreachable");
    assert_eq!(progress.current(), 0);
    assert!(uploader.image_batches().is_empty());

    uploader.recover();
    let receipt = uploader
        .upload_images(ImageUploadRequest {
            images: vec![jpeg(1)],
            timestamp: Utc::now(),
            upload_progress: progress.clone(),
        })
        .await
        .unwrap();
    assert_eq!(receipt.locations.len(), 1);
    assert!(progress.is_complete());
}

#[tokio::test]
async fn test_progress_callback_sees_each_image() {
    let uploader = MemoryUploader::new("inspections/truck-7");
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();

    uploader
        .upload_images(ImageUploadRequest {
            images: (0..4).map(jpeg).collect(),
            timestamp: Utc::now(),
            upload_progress: UploadProgress::new(Arc::new(move |p| sink.lock().push(p))),
        })
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![25, 50, 75, 100]);
}

#[tokio::test]
async fn test_video_request_carries_clip() {
    let clip = VideoClip {
        id: uuid::Uuid::new_v4(),
        data: bytes::Bytes::from_static(b"webm"),
        mime_type: "video/webm".to_string(),
        duration_secs: 12,
        captured_at: Utc::now(),
    };

    let request = VideoUploadRequest::from_clip(&clip);
    assert_eq!(request.duration, 12);
    assert_eq!(request.data_url, "data:video/webm;base64,d2VibQ==");
    assert_eq!(request.timestamp, clip.captured_at);

    let uploader = MemoryUploader::new("inspections/van-2");
    let receipt = uploader.upload_video(request).await.unwrap();
    assert!(receipt.locations[0].ends_with(".webm"));
    assert_eq!(uploader.videos()[0].blob.len(), 4);
}

// ============================================================================
// STORAGE LABEL TESTS
// ============================================================================

#[tokio::test]
async fn test_uploaded_set_lists_with_capture_labels() {
    let folder = "inspections/truck-7";
    let uploader = MemoryUploader::new(folder);
    let receipt = uploader
        .upload_images(ImageUploadRequest {
            images: (0..7).map(jpeg).collect(),
            timestamp: Utc::now(),
            upload_progress: UploadProgress::silent(),
        })
        .await
        .unwrap();

    let mut locations = receipt.locations;
    locations.reverse();
    let storage = ReceiptStorage {
        folder: folder.to_string(),
        locations,
    };

    let files = list_labeled(&storage, folder).await.unwrap();
    let labels: Vec<String> = files.iter().map(|f| f.view.to_string()).collect();
    assert_eq!(
        labels,
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
    assert!(files[0].name.ends_with("_0.jpg"));
    assert!(files[6].name.ends_with("_6.jpg"));
}

#[test]
fn test_listing_unknown_folder_fails() {
    let storage = ReceiptStorage {
        folder: "inspections/truck-7".to_string(),
        locations: Vec::new(),
    };
    tokio_test::assert_ok!(tokio_test::block_on(list_labeled(&storage, "inspections/truck-7")));

    let error = tokio_test::assert_err!(tokio_test::block_on(list_labeled(
        &storage,
        "inspections/van-2"
    )));
    assert!(matches!(error, CoreError::Storage { .. }));
}

#[test]
fn test_inspection_kinds_get_separate_folders() {
    let at = Utc::now();
    let folders: Vec<String> = [
        InspectionKind::Agreement,
        InspectionKind::PunchIn,
        InspectionKind::PunchOut,
    ]
    .iter()
    .map(|kind| inspection_folder("truck-7", *kind, at))
    .collect();

    assert!(folders[0].contains("/agreement/"));
    assert!(folders[1].contains("/punch-in/"));
    assert!(folders[2].contains("/punch-out/"));
}
