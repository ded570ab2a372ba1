use chrono::{DateTime, Utc};
use common::FileCategory;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::file_upload;

/// Response DTO for a single uploaded file.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Original upload filename.
    #[schema(example = "holiday.png")]
    pub file_name: String,
    /// MIME content type.
    #[schema(example = "image/png")]
    pub file_type: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub file_size: i64,
    /// Object key inside the category's bucket.
    #[schema(example = "0193.../0193....png")]
    pub storage_path: String,
    pub category: FileCategory,
    pub created_at: DateTime<Utc>,
}

impl From<file_upload::Model> for FileResponse {
    fn from(model: file_upload::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            file_name: model.file_name,
            file_type: model.file_type,
            file_size: model.file_size,
            storage_path: model.storage_path,
            category: model.category,
            created_at: model.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub total: u64,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// `image` or `document`.
    pub category: FileCategory,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileListQuery {
    /// Restrict to one category.
    pub category: Option<FileCategory>,
}

/// A link that serves the object without a bearer token.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileUrlResponse {
    pub url: String,
    /// `None` for objects in public buckets.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of the two-step delete.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteFileResponse {
    pub id: Uuid,
    /// Whether the stored object was removed. `false` when the object policy
    /// denied removal or the object was already gone.
    pub object_removed: bool,
}
