use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::profile;
use crate::error::{AppError, ErrorBody};
use crate::events::AuthEventKind;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::publish;
use crate::models::profile::{ProfileResponse, UpdateProfileRequest, validate_name};
use crate::policy::{self, Operation, Table};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profiles",
    operation_id = "getOwnProfile",
    summary = "Get the caller's profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No profile (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_own_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let model = find_visible_profile(&state.db, auth_user.user_id, auth_user.user_id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/profile",
    tag = "Profiles",
    operation_id = "updateOwnProfile",
    summary = "Update the caller's display name",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No profile (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_own_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_name(&payload.name)?;

    let existing = profile::Entity::find()
        .filter(profile::Column::UserId.eq(auth_user.user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

    if !policy::permits(
        &state.db,
        auth_user.user_id,
        Table::Profiles,
        Operation::Update,
        existing.user_id,
    )
    .await?
    {
        return Err(AppError::NotFound("Profile not found".into()));
    }

    let mut active: profile::ActiveModel = existing.into();
    active.name = Set(payload.name.trim().to_string());
    let model = active.update(&state.db).await?;

    publish(&state, auth_user.user_id, AuthEventKind::UserUpdated);
    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/profiles/{user_id}",
    tag = "Profiles",
    operation_id = "getProfile",
    summary = "Get a user's profile",
    description = "Owners see their own profile; admins see any.",
    params(("user_id" = Uuid, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, target = %user_id))]
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    let model = find_visible_profile(&state.db, auth_user.user_id, user_id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/profiles/{user_id}",
    tag = "Profiles",
    operation_id = "deleteProfile",
    summary = "Delete a user's profile",
    description = "Owners may delete their own profile; admins may delete any.",
    params(("user_id" = Uuid, Path, description = "Owning user ID")),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, target = %user_id))]
pub async fn delete_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_visible_profile(&state.db, auth_user.user_id, user_id).await?;

    if !policy::permits(
        &state.db,
        auth_user.user_id,
        Table::Profiles,
        Operation::Delete,
        existing.user_id,
    )
    .await?
    {
        return Err(AppError::NotFound("Profile not found".into()));
    }

    profile::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_visible_profile<C: ConnectionTrait>(
    db: &C,
    caller: Uuid,
    owner: Uuid,
) -> Result<profile::Model, AppError> {
    let scope = policy::select_scope(db, caller, Table::Profiles).await?;
    scope
        .apply(profile::Entity::find())
        .filter(profile::Column::UserId.eq(owner))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))
}
