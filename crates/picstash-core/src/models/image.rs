use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::file::StoredFile;

/// Image lifecycle state.
///
/// `Processing` transitions exactly once, to `Stored` or `Failed`; both are
/// terminal. An image may also be created directly in `Stored` when no resize
/// is needed. The string form exists only at the repository and API
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "image_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Processing,
    Stored,
    Failed,
}

impl ImageStatus {
    /// Terminal states never transition again; redelivered resize work for a
    /// terminal image is skipped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageStatus::Stored | ImageStatus::Failed)
    }
}

impl Display for ImageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ImageStatus::Processing => write!(f, "processing"),
            ImageStatus::Stored => write!(f, "stored"),
            ImageStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ImageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ImageStatus::Processing),
            "stored" => Ok(ImageStatus::Stored),
            "failed" => Ok(ImageStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid image status: {}", s)),
        }
    }
}

/// A logical image resource: one user upload request, pinned to one requested
/// target size. Several rows may share the same original and processed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Image {
    pub id: Uuid,
    pub title: String,
    pub original_width: i32,
    pub original_height: i32,
    pub processed_width: Option<i32>,
    pub processed_height: Option<i32>,
    pub original_file_id: Uuid,
    pub processed_file_id: Option<Uuid>,
    pub status: ImageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload for an image that is complete at insert time: either the
/// original already has the requested dimensions, or an existing processed
/// file is being reused. Processed fields are mandatory here.
#[derive(Debug, Clone)]
pub struct NewStoredImage {
    pub title: String,
    pub original_width: i32,
    pub original_height: i32,
    pub processed_width: i32,
    pub processed_height: i32,
    pub original_file_id: Uuid,
    pub processed_file_id: Uuid,
}

/// Creation payload for an image awaiting asynchronous resize. Processed
/// fields are absent by construction; the worker fills them on completion.
#[derive(Debug, Clone)]
pub struct NewProcessingImage {
    pub title: String,
    pub original_width: i32,
    pub original_height: i32,
    pub original_file_id: Uuid,
}

/// An image joined with its file rows, as loaded for DTO assembly and for the
/// resize worker.
#[derive(Debug, Clone)]
pub struct ImageDetails {
    pub image: Image,
    pub original_file: StoredFile,
    pub processed_file: Option<StoredFile>,
}

impl ImageDetails {
    /// The URL a client should use right now: the processed artifact when it
    /// exists, otherwise the original.
    pub fn serving_url(&self) -> &str {
        self.processed_file
            .as_ref()
            .map(|f| f.url.as_str())
            .unwrap_or(self.original_file.url.as_str())
    }

    /// Dimensions to report: processed when known, otherwise the original's.
    pub fn serving_dimensions(&self) -> (i32, i32) {
        match (self.image.processed_width, self.image.processed_height) {
            (Some(w), Some(h)) => (w, h),
            _ => (self.image.original_width, self.image.original_height),
        }
    }
}
