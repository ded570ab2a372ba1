use chrono::{DateTime, Utc};
use common::storage::{Bucket, ObjectKey};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `{bucket}/{owner}/{name}` path parameters addressing one object.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ObjectPath {
    /// `images` or `documents`.
    pub bucket: String,
    /// First key segment: the owning user's id.
    pub owner: String,
    pub name: String,
}

impl ObjectPath {
    pub fn resolve(&self) -> Result<(Bucket, ObjectKey), AppError> {
        let bucket = self.bucket.parse::<Bucket>()?;
        let key = ObjectKey::from_parts(&self.owner, &self.name)?;
        Ok((bucket, key))
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignedObjectQuery {
    pub token: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PutObjectResponse {
    #[schema(example = "images")]
    pub bucket: Bucket,
    #[schema(example = "0193.../avatar.png")]
    pub key: String,
    pub size: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SignedUrlResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
