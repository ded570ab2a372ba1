use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::FileCategory;
use common::storage::{BoxReader, Bucket, ObjectKey, ObjectStore};
use sea_orm::*;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::entity::file_upload;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppQuery;
use crate::handlers::storage::{object_response, public_url, signed_url};
use crate::models::file::{
    DeleteFileResponse, FileListQuery, FileListResponse, FileResponse, FileUrlResponse,
    UploadQuery,
};
use crate::policy::{self, Operation, Scope, Table};
use crate::state::AppState;
use crate::utils::filename::{storage_extension, validate_flat_filename};

/// Request body limit for uploads: the largest category cap plus room for
/// multipart framing. The per-category cap is enforced while streaming.
pub fn upload_body_limit(storage: &StorageConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(upload_body_bytes(storage))
}

fn upload_body_bytes(storage: &StorageConfig) -> usize {
    let largest = Ord::max(storage.image_max_bytes, storage.document_max_bytes);
    usize::try_from(largest)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload an image or document",
    description = "Uploads the multipart `file` field into the category's bucket under \
        `{user_id}/{generated}.{ext}`, then records its metadata. The content type must be \
        allowed for the category; images are capped at 5 MiB and documents at 10 MiB. \
        If recording metadata fails, the stored object is not removed.",
    params(UploadQuery),
    request_body(content_type = "multipart/form-data", description = "A single `file` field"),
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query, multipart), fields(user_id = %auth_user.user_id, category = %query.category))]
pub async fn upload_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let category = query.category;
    let bucket = category.bucket();
    let max_size = state.config.storage.max_bytes(bucket);

    let mut stored: Option<StoredPart> = None;
    if let Err(e) = read_file_part(
        &mut multipart,
        &state,
        auth_user.user_id,
        category,
        max_size,
        &mut stored,
    )
    .await
    {
        if let Some(part) = &stored {
            discard_object(&*state.store, bucket, &part.0).await;
        }
        return Err(e);
    }

    let (key, file_name, content_type, size) =
        stored.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let row = file_upload::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(auth_user.user_id),
        file_name: Set(file_name),
        file_type: Set(content_type),
        file_size: Set(i64::try_from(size).unwrap_or(i64::MAX)),
        storage_path: Set(key.to_string()),
        category: Set(category),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await;

    let model = match row {
        Ok(model) => model,
        Err(e) => {
            tracing::warn!(
                storage_path = %key,
                %bucket,
                "File metadata insert failed, stored object is orphaned: {e}"
            );
            return Err(e.into());
        }
    };

    tracing::info!(file_id = %model.id, storage_path = %model.storage_path, size, "File uploaded");
    Ok((StatusCode::CREATED, Json(FileResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List the caller's files",
    description = "Returns the caller's own uploads, newest first, optionally filtered by category.",
    params(FileListQuery),
    responses(
        (status = 200, description = "List of files", body = FileListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FileListQuery>,
) -> Result<Json<FileListResponse>, AppError> {
    let list = list_scoped(&state.db, Scope::OwnedBy(auth_user.user_id), query.category).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Get file metadata",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, file_id = %id))]
pub async fn get_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileResponse>, AppError> {
    let model = find_visible_file(&state.db, auth_user.user_id, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/content",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download a file's content",
    description = "Requires both read access to the metadata row and access to the object path.",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, file_id = %id))]
pub async fn download_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let model = find_visible_file(&state.db, auth_user.user_id, id).await?;
    let key = object_key(&model)?;
    require_object_access(&state, auth_user.user_id, &key).await?;

    object_response(
        &*state.store,
        model.category.bucket(),
        &key,
        Some((&model.file_name, &model.file_type)),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/{id}/url",
    tag = "Files",
    operation_id = "getFileUrl",
    summary = "Get a shareable URL for a file",
    description = "Private buckets get a signed URL valid for `storage.signed_url_ttl_secs` \
        (one hour by default); public buckets get a permanent URL.",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "URL", body = FileUrlResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, file_id = %id))]
pub async fn get_file_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileUrlResponse>, AppError> {
    let model = find_visible_file(&state.db, auth_user.user_id, id).await?;
    let key = object_key(&model)?;
    require_object_access(&state, auth_user.user_id, &key).await?;

    let bucket = model.category.bucket();
    let response = if state.config.storage.is_public(bucket) {
        FileUrlResponse {
            url: public_url(&state.config, bucket, &key),
            expires_at: None,
        }
    } else {
        let (url, expires_at) = signed_url(&state.config, bucket, &key)?;
        FileUrlResponse {
            url,
            expires_at: Some(expires_at),
        }
    };
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Files",
    operation_id = "deleteFile",
    summary = "Delete a file",
    description = "Removes the stored object, then the metadata row. The object is only \
        removed when the caller owns its path, so an admin deleting another user's file \
        removes the row but leaves the object (`object_removed: false`). The two steps are \
        not atomic.",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted", body = DeleteFileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, file_id = %id))]
pub async fn delete_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteFileResponse>, AppError> {
    let model = find_visible_file(&state.db, auth_user.user_id, id).await?;
    let bucket = model.category.bucket();

    if !policy::permits(
        &state.db,
        auth_user.user_id,
        Table::FileUploads,
        Operation::Delete,
        model.user_id,
    )
    .await?
    {
        return Err(AppError::NotFound("File not found".into()));
    }

    let object_removed = match object_key(&model) {
        Ok(key) => remove_object(&state, auth_user.user_id, bucket, &key).await?,
        Err(e) => {
            tracing::warn!(storage_path = %model.storage_path, "Unparseable storage path: {e:?}");
            false
        }
    };

    file_upload::Entity::delete_by_id(model.id)
        .exec(&state.db)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                storage_path = %model.storage_path,
                object_removed,
                "File row delete failed after object step: {e}"
            );
        })?;

    tracing::info!(storage_path = %model.storage_path, object_removed, "File deleted");
    Ok(Json(DeleteFileResponse {
        id: model.id,
        object_removed,
    }))
}

/// Stored object key, original filename, content type and size.
type StoredPart = (ObjectKey, String, String, u64);

/// Reads the multipart body, streaming the single `file` part into the
/// store. `stored` is set as soon as an object exists so the caller can
/// remove it if a later part fails.
async fn read_file_part(
    multipart: &mut Multipart,
    state: &AppState,
    owner: Uuid,
    category: FileCategory,
    max_size: u64,
    stored: &mut Option<StoredPart>,
) -> Result<(), AppError> {
    let bucket = category.bucket();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }
        if stored.is_some() {
            return Err(AppError::Validation("Only one 'file' field is allowed".into()));
        }

        let file_name = field
            .file_name()
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
        let file_name = validate_flat_filename(file_name)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();

        let content_type = upload_content_type(field.content_type(), &file_name);
        if !category.accepts(&content_type) {
            return Err(AppError::Validation(format!(
                "File type '{content_type}' is not allowed for {category} uploads"
            )));
        }

        let key = ObjectKey::generate(owner, &storage_extension(&file_name, &content_type));
        let size = stream_field_to_store(field, &*state.store, bucket, &key, max_size).await?;
        *stored = Some((key, file_name, content_type, size));
    }
    Ok(())
}

/// Removes an object written by a request that then failed.
async fn discard_object(store: &dyn ObjectStore, bucket: Bucket, key: &ObjectKey) {
    match store.delete(bucket, key).await {
        Ok(_) => tracing::info!(storage_path = %key, %bucket, "Discarded object of failed upload"),
        Err(e) => tracing::warn!(
            storage_path = %key,
            %bucket,
            "Failed upload left an orphaned object: {e}"
        ),
    }
}

/// Step one of a file delete. A policy denial or a missing object removes
/// nothing and is not an error.
async fn remove_object(
    state: &AppState,
    caller: Uuid,
    bucket: Bucket,
    key: &ObjectKey,
) -> Result<bool, AppError> {
    let allowed = policy::permits_object(
        &state.db,
        caller,
        key,
        state.config.storage.admin_object_override,
    )
    .await?;
    if !allowed {
        tracing::info!(storage_path = %key, "Object policy denied removal, object kept");
        return Ok(false);
    }
    Ok(state.store.delete(bucket, key).await?)
}

async fn require_object_access(
    state: &AppState,
    caller: Uuid,
    key: &ObjectKey,
) -> Result<(), AppError> {
    let allowed = policy::permits_object(
        &state.db,
        caller,
        key,
        state.config.storage.admin_object_override,
    )
    .await?;
    if allowed {
        Ok(())
    } else {
        Err(AppError::NotFound("File not found".into()))
    }
}

fn object_key(model: &file_upload::Model) -> Result<ObjectKey, AppError> {
    model
        .object_key()
        .map_err(|e| AppError::Internal(format!("Bad storage path '{}': {e}", model.storage_path)))
}

async fn find_visible_file<C: ConnectionTrait>(
    db: &C,
    caller: Uuid,
    id: Uuid,
) -> Result<file_upload::Model, AppError> {
    let scope = policy::select_scope(db, caller, Table::FileUploads).await?;
    scope
        .apply(file_upload::Entity::find_by_id(id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))
}

/// Newest-first listing of the uploads inside `scope`.
pub(crate) async fn list_scoped<C: ConnectionTrait>(
    db: &C,
    scope: Scope,
    category: Option<FileCategory>,
) -> Result<FileListResponse, AppError> {
    let mut select = scope.apply(file_upload::Entity::find());
    if let Some(category) = category {
        select = select.filter(file_upload::Column::Category.eq(category));
    }

    let files: Vec<FileResponse> = select
        .order_by_desc(file_upload::Column::CreatedAt)
        .order_by_desc(file_upload::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(FileResponse::from)
        .collect();

    let total = files.len() as u64;
    Ok(FileListResponse { files, total })
}

/// Content type of an upload: the part's declared type, or a guess from the
/// filename when the client sent none or a generic one.
fn upload_content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string(),
    }
}

/// Stream a multipart field into the object store via a temp file,
/// enforcing `max_size` on the way.
async fn stream_field_to_store(
    mut field: axum::extract::multipart::Field<'_>,
    store: &dyn ObjectStore,
    bucket: Bucket,
    key: &ObjectKey,
    max_size: u64,
) -> Result<u64, AppError> {
    let temp_path = std::env::temp_dir().join(format!("vault-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        Ok(store.put_stream(bucket, key, reader, max_size).await?)
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&temp_path).await;

    result
}
