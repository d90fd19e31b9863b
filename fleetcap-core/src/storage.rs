//! Storage/list collaborator contract and stored-file labelling

use crate::error::CoreResult;
use crate::labels::InspectionView;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of inspection a set of artifacts belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InspectionKind {
    /// Vehicle checkout agreement
    Agreement,
    /// Start of shift
    PunchIn,
    /// End of shift
    PunchOut,
}

impl fmt::Display for InspectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectionKind::Agreement => write!(f, "agreement"),
            InspectionKind::PunchIn => write!(f, "punch-in"),
            InspectionKind::PunchOut => write!(f, "punch-out"),
        }
    }
}

/// Folder path artifacts of one inspection are stored under
pub fn inspection_folder(vehicle_id: &str, kind: InspectionKind, at: DateTime<Utc>) -> String {
    format!(
        "inspections/{}/{}/{}",
        vehicle_id,
        kind,
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// A stored file with the label inferred from its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFile {
    /// Stored file name
    pub name: String,
    /// Positional label
    pub view: InspectionView,
}

/// Label stored file names by position after sorting them
///
/// Upload names start with the hand-off timestamp followed by the capture
/// index, so lexical order matches capture order.
pub fn label_stored_files(names: &[String]) -> Vec<LabeledFile> {
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort();
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, name)| LabeledFile {
            name: name.clone(),
            view: InspectionView::from_position(index),
        })
        .collect()
}

/// External collaborator listing stored artifacts
#[async_trait]
pub trait StorageCollaborator: Send + Sync {
    /// File names stored directly under `folder`
    async fn list(&self, folder: &str) -> CoreResult<Vec<String>>;
}

/// List `folder` and label its files positionally
pub async fn list_labeled(
    storage: &dyn StorageCollaborator,
    folder: &str,
) -> CoreResult<Vec<LabeledFile>> {
    let names = storage.list(folder).await?;
    tracing::debug!(folder, count = names.len(), "Listed stored inspection files");
    Ok(label_stored_files(&names))
}
