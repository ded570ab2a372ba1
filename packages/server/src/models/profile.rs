use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::auth::validate_name;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    /// Display name (1-100 characters).
    #[schema(example = "Alice")]
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Alice")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::profile::Model> for ProfileResponse {
    fn from(m: crate::entity::profile::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            created_at: m.created_at,
        }
    }
}
