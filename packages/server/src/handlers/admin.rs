use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use common::Role;
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::{user, user_role};
use crate::error::{AppError, ErrorBody};
use crate::events::AuthEventKind;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::handlers::auth::{publish, user_response};
use crate::handlers::{files, notes};
use crate::models::admin::{
    AdminFileListQuery, AdminUserListResponse, GrantRoleRequest, UserRolesResponse,
};
use crate::models::file::FileListResponse;
use crate::models::note::{NoteListQuery, NoteListResponse};
use crate::policy::{self, Operation, Table};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/users",
    tag = "Admin",
    operation_id = "listUsers",
    summary = "List all users",
    description = "Returns every identity with its display name and roles. Requires the `admin` role.",
    responses(
        (status = 200, description = "Users", body = AdminUserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminUserListResponse>, AppError> {
    policy::require_admin(&state.db, auth_user.user_id).await?;

    let models = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let mut users = Vec::with_capacity(models.len());
    for model in models {
        users.push(user_response(&state.db, model).await?);
    }

    Ok(Json(AdminUserListResponse { users }))
}

#[utoipa::path(
    get,
    path = "/users/{id}/roles",
    tag = "Admin",
    operation_id = "getUserRoles",
    summary = "List a user's roles",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles", body = UserRolesResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, target = %id))]
pub async fn get_user_roles(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRolesResponse>, AppError> {
    policy::require_admin(&state.db, auth_user.user_id).await?;
    find_user(&state.db, id).await?;

    Ok(Json(load_roles(&state.db, auth_user.user_id, id).await?))
}

#[utoipa::path(
    post,
    path = "/users/{id}/roles",
    tag = "Admin",
    operation_id = "grantRole",
    summary = "Grant a role to a user",
    description = "Takes effect on the user's next request; no re-login needed.",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = GrantRoleRequest,
    responses(
        (status = 201, description = "Role granted", body = UserRolesResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Role already held (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id, target = %id, role = %payload.role))]
pub async fn grant_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<GrantRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !policy::permits(&state.db, auth_user.user_id, Table::UserRoles, Operation::Insert, id)
        .await?
    {
        return Err(AppError::PermissionDenied);
    }
    find_user(&state.db, id).await?;

    if policy::has_role(&state.db, id, payload.role).await? {
        return Err(AppError::Conflict(format!(
            "User already has role '{}'",
            payload.role
        )));
    }

    user_role::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(id),
        role: Set(payload.role),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("User already has role '{}'", payload.role))
        }
        _ => AppError::from(e),
    })?;

    tracing::info!("Role granted");
    publish(&state, id, AuthEventKind::UserUpdated);

    Ok((
        StatusCode::CREATED,
        Json(load_roles(&state.db, auth_user.user_id, id).await?),
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/roles/{role}",
    tag = "Admin",
    operation_id = "revokeRole",
    summary = "Revoke a role from a user",
    description = "Takes effect on the user's next request.",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("role" = Role, Path, description = "Role to revoke"),
    ),
    responses(
        (status = 204, description = "Role revoked"),
        (status = 400, description = "Unknown role (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User does not hold the role (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, target = %id, role = %role))]
pub async fn revoke_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, role)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    if !policy::permits(&state.db, auth_user.user_id, Table::UserRoles, Operation::Delete, id)
        .await?
    {
        return Err(AppError::PermissionDenied);
    }
    let role: Role = role
        .parse()
        .map_err(|e: common::role::ParseRoleError| AppError::Validation(e.to_string()))?;

    let result = user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(id))
        .filter(user_role::Column::Role.eq(role))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("User does not have role '{role}'")));
    }

    tracing::info!("Role revoked");
    publish(&state, id, AuthEventKind::UserUpdated);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/notes",
    tag = "Admin",
    operation_id = "adminListNotes",
    summary = "List every user's notes",
    params(NoteListQuery),
    responses(
        (status = 200, description = "List of notes", body = NoteListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_all_notes(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NoteListQuery>,
) -> Result<Json<NoteListResponse>, AppError> {
    policy::require_admin(&state.db, auth_user.user_id).await?;

    let scope = policy::select_scope(&state.db, auth_user.user_id, Table::Notes).await?;
    Ok(Json(notes::list_scoped(&state.db, scope, &query).await?))
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "Admin",
    operation_id = "adminListFiles",
    summary = "List every user's files",
    params(AdminFileListQuery),
    responses(
        (status = 200, description = "List of files", body = FileListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_all_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AdminFileListQuery>,
) -> Result<Json<FileListResponse>, AppError> {
    policy::require_admin(&state.db, auth_user.user_id).await?;

    let scope = policy::select_scope(&state.db, auth_user.user_id, Table::FileUploads).await?;
    Ok(Json(files::list_scoped(&state.db, scope, query.category).await?))
}

async fn find_user<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn load_roles<C: ConnectionTrait>(
    db: &C,
    caller: Uuid,
    user_id: Uuid,
) -> Result<UserRolesResponse, AppError> {
    let scope = policy::select_scope(db, caller, Table::UserRoles).await?;
    let roles = scope
        .apply(user_role::Entity::find())
        .filter(user_role::Column::UserId.eq(user_id))
        .order_by_asc(user_role::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.role)
        .collect();

    Ok(UserRolesResponse { user_id, roles })
}
