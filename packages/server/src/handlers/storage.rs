use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::storage::{BoxReader, Bucket, ObjectKey, ObjectStore};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::instrument;

use crate::config::AppConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppQuery;
use crate::models::storage::{ObjectPath, PutObjectResponse, SignedObjectQuery, SignedUrlResponse};
use crate::policy;
use crate::state::AppState;
use crate::utils::jwt;

#[utoipa::path(
    put,
    path = "/objects/{bucket}/{owner}/{name}",
    tag = "Storage",
    operation_id = "putObject",
    summary = "Upload or replace an object",
    description = "Stores the raw request body under `{owner}/{name}`. `owner` must be the \
        caller's own user ID. The bucket's size cap applies.",
    params(ObjectPath),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Object stored", body = PutObjectResponse),
        (status = 400, description = "Invalid key or too large (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Path not owned by caller (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, path, body), fields(user_id = %auth_user.user_id, bucket = %path.bucket))]
pub async fn put_object(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<ObjectPath>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let (bucket, key) = path.resolve()?;

    // Writes never take the admin override.
    if !key.is_owned_by(auth_user.user_id) {
        return Err(AppError::PermissionDenied);
    }

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let reader: BoxReader = Box::new(StreamReader::new(stream));
    let size = state
        .store
        .put_stream(bucket, &key, reader, state.config.storage.max_bytes(bucket))
        .await?;

    tracing::info!(storage_path = %key, size, "Object stored");
    Ok((
        StatusCode::CREATED,
        Json(PutObjectResponse {
            bucket,
            key: key.to_string(),
            size,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/objects/{bucket}/{owner}/{name}",
    tag = "Storage",
    operation_id = "getObject",
    summary = "Download an object",
    params(ObjectPath),
    responses(
        (status = 200, description = "Object content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, path), fields(user_id = %auth_user.user_id, bucket = %path.bucket))]
pub async fn get_object(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<ObjectPath>,
) -> Result<Response, AppError> {
    let (bucket, key) = path.resolve()?;
    require_object_access(&state, &auth_user, &key).await?;
    object_response(&*state.store, bucket, &key, None).await
}

#[utoipa::path(
    delete,
    path = "/objects/{bucket}/{owner}/{name}",
    tag = "Storage",
    operation_id = "deleteObject",
    summary = "Delete an object",
    params(ObjectPath),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, path), fields(user_id = %auth_user.user_id, bucket = %path.bucket))]
pub async fn delete_object(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<ObjectPath>,
) -> Result<impl IntoResponse, AppError> {
    let (bucket, key) = path.resolve()?;
    require_object_access(&state, &auth_user, &key).await?;

    if !state.store.delete(bucket, &key).await? {
        return Err(AppError::NotFound("Object not found".into()));
    }
    tracing::info!(storage_path = %key, "Object deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/sign/{bucket}/{owner}/{name}",
    tag = "Storage",
    operation_id = "signObjectUrl",
    summary = "Create a signed URL for an object",
    description = "Returns a link that serves the object without a bearer token until it expires.",
    params(ObjectPath),
    responses(
        (status = 200, description = "Signed URL", body = SignedUrlResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, path), fields(user_id = %auth_user.user_id, bucket = %path.bucket))]
pub async fn sign_object_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<ObjectPath>,
) -> Result<Json<SignedUrlResponse>, AppError> {
    let (bucket, key) = path.resolve()?;
    require_object_access(&state, &auth_user, &key).await?;

    if !state.store.exists(bucket, &key).await? {
        return Err(AppError::NotFound("Object not found".into()));
    }

    let (url, expires_at) = signed_url(&state.config, bucket, &key)?;
    Ok(Json(SignedUrlResponse { url, expires_at }))
}

#[utoipa::path(
    get,
    path = "/signed/{bucket}/{owner}/{name}",
    tag = "Storage",
    operation_id = "getSignedObject",
    summary = "Download an object through a signed URL",
    params(ObjectPath, SignedObjectQuery),
    responses(
        (status = 200, description = "Object content"),
        (status = 401, description = "Bad or expired signature (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Object not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, path, query), fields(bucket = %path.bucket))]
pub async fn get_signed_object(
    State(state): State<AppState>,
    Path(path): Path<ObjectPath>,
    AppQuery(query): AppQuery<SignedObjectQuery>,
) -> Result<Response, AppError> {
    let (bucket, key) = path.resolve()?;

    let claims = jwt::verify_object(&query.token, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::TokenInvalid)?;
    if claims.bucket != bucket || claims.key != key.to_string() {
        return Err(AppError::TokenInvalid);
    }

    object_response(&*state.store, bucket, &key, None).await
}

#[utoipa::path(
    get,
    path = "/public/{bucket}/{owner}/{name}",
    tag = "Storage",
    operation_id = "getPublicObject",
    summary = "Download an object from a public bucket",
    params(ObjectPath),
    responses(
        (status = 200, description = "Object content"),
        (status = 404, description = "Not found or bucket not public (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, path), fields(bucket = %path.bucket))]
pub async fn get_public_object(
    State(state): State<AppState>,
    Path(path): Path<ObjectPath>,
) -> Result<Response, AppError> {
    let (bucket, key) = path.resolve()?;
    if !state.config.storage.is_public(bucket) {
        return Err(AppError::NotFound("Object not found".into()));
    }
    object_response(&*state.store, bucket, &key, None).await
}

/// Object policy for reads and deletes. Denial looks like absence.
async fn require_object_access(
    state: &AppState,
    auth_user: &AuthUser,
    key: &ObjectKey,
) -> Result<(), AppError> {
    let allowed = policy::permits_object(
        &state.db,
        auth_user.user_id,
        key,
        state.config.storage.admin_object_override,
    )
    .await?;
    if allowed {
        Ok(())
    } else {
        Err(AppError::NotFound("Object not found".into()))
    }
}

/// Time-limited URL for a private object.
pub(crate) fn signed_url(
    config: &AppConfig,
    bucket: Bucket,
    key: &ObjectKey,
) -> Result<(String, DateTime<Utc>), AppError> {
    let (token, expires_at) = jwt::sign_object(
        bucket,
        key,
        config.storage.signed_url_ttl_secs,
        &config.auth.jwt_secret,
    )
    .map_err(|e| AppError::Internal(format!("URL signing error: {e}")))?;

    let url = format!(
        "{}/api/v1/storage/signed/{}/{}?token={}",
        config.server.public_url.trim_end_matches('/'),
        bucket,
        key,
        token
    );
    Ok((url, expires_at))
}

/// Permanent URL for an object in a public bucket.
pub(crate) fn public_url(config: &AppConfig, bucket: Bucket, key: &ObjectKey) -> String {
    format!(
        "{}/api/v1/storage/public/{}/{}",
        config.server.public_url.trim_end_matches('/'),
        bucket,
        key
    )
}

/// Stream an object back to the client.
///
/// `file_name` is the original upload name, when known; it drives the
/// content type and `Content-Disposition`.
pub(crate) async fn object_response(
    store: &dyn ObjectStore,
    bucket: Bucket,
    key: &ObjectKey,
    file_name: Option<(&str, &str)>,
) -> Result<Response, AppError> {
    let size = store.size(bucket, key).await?;
    let reader = store.get_stream(bucket, key).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let (name, content_type) = match file_name {
        Some((name, content_type)) => (name.to_string(), content_type.to_string()),
        None => (
            key.name().to_string(),
            mime_guess::from_path(key.name())
                .first_or_octet_stream()
                .to_string(),
        ),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CONTENT_DISPOSITION, content_disposition_value(&name))
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                String::from(b as char)
            }
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
