//! # Fleet Capture Core
//!
//! Shared artifact types and collaborator contracts for the fleet capture
//! engines. The engines produce [`EncodedImage`] and [`VideoClip`] values and
//! hand them to an [`UploadCollaborator`]; report pages list stored files
//! through a [`StorageCollaborator`] and label them with [`InspectionView`].

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod error;
pub mod labels;
pub mod storage;
pub mod upload;

// Re-export main types
pub use artifact::{EncodedImage, ImageFormat, VideoClip};
pub use error::{CoreError, CoreResult};
pub use labels::InspectionView;
pub use storage::{
    inspection_folder, label_stored_files, list_labeled, InspectionKind, LabeledFile,
    StorageCollaborator,
};
pub use upload::{
    ImageUploadRequest, MemoryUploader, ProgressCallback, UploadCollaborator, UploadProgress,
    UploadReceipt, VideoUploadRequest,
};
