use common::{FileCategory, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::auth::UserResponse;

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminUserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GrantRoleRequest {
    #[schema(example = "admin")]
    pub role: Role,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserRolesResponse {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminFileListQuery {
    pub category: Option<FileCategory>,
}
