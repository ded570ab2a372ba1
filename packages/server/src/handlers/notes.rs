use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::note;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::note::*;
use crate::policy::{self, Operation, Scope, Table};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Notes",
    operation_id = "listNotes",
    summary = "List the caller's notes",
    description = "Returns the caller's own notes, newest first, with optional case-insensitive \
        title search. Admins use `/admin/notes` to list every owner's notes.",
    params(NoteListQuery),
    responses(
        (status = 200, description = "List of notes", body = NoteListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_notes(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NoteListQuery>,
) -> Result<Json<NoteListResponse>, AppError> {
    let list = list_scoped(&state.db, Scope::OwnedBy(auth_user.user_id), &query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Notes",
    operation_id = "createNote",
    summary = "Create a note",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_note(&payload)?;

    let model = insert_note(
        &state.db,
        auth_user.user_id,
        payload.title.trim().to_string(),
        payload.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(NoteResponse::from(model))))
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "Notes",
    operation_id = "createChatNote",
    summary = "Capture a chat message as a note",
    description = "Stores the message as the note content. The title is the message's first \
        line, cut to 50 characters with `…` appended when cut.",
    request_body = ChatNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_chat_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChatNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_chat_message(&payload)?;

    let title = chat_title(&payload.message);
    let model = insert_note(&state.db, auth_user.user_id, title, Some(payload.message)).await?;

    Ok((StatusCode::CREATED, Json(NoteResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Notes",
    operation_id = "getNote",
    summary = "Get a note by ID",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note", body = NoteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, note_id = %id))]
pub async fn get_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteResponse>, AppError> {
    let model = find_visible_note(&state.db, auth_user.user_id, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Notes",
    operation_id = "updateNote",
    summary = "Update a note",
    description = "Partially updates a note using PATCH semantics. `content: null` clears the \
        content. Only the owner may update; `updated_at` is always set by the server.",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id, note_id = %id))]
pub async fn update_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    validate_update_note(&payload)?;

    let txn = state.db.begin().await?;

    let existing = find_visible_note(&txn, auth_user.user_id, id).await?;
    if !policy::permits(
        &txn,
        auth_user.user_id,
        Table::Notes,
        Operation::Update,
        existing.user_id,
    )
    .await?
    {
        return Err(AppError::NotFound("Note not found".into()));
    }

    if payload == UpdateNoteRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: note::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Notes",
    operation_id = "deleteNote",
    summary = "Delete a note",
    description = "Owners may delete their own notes; admins may delete any note.",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not permitted (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id, note_id = %id))]
pub async fn delete_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_visible_note(&state.db, auth_user.user_id, id).await?;
    if !policy::permits(
        &state.db,
        auth_user.user_id,
        Table::Notes,
        Operation::Delete,
        existing.user_id,
    )
    .await?
    {
        return Err(AppError::NotFound("Note not found".into()));
    }

    note::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn insert_note<C: ConnectionTrait>(
    db: &C,
    owner: Uuid,
    title: String,
    content: Option<String>,
) -> Result<note::Model, AppError> {
    // Timestamps are filled in by the note's save hook.
    let model = note::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(owner),
        title: Set(title),
        content: Set(content),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::debug!(note_id = %model.id, "Note created");
    Ok(model)
}

async fn find_visible_note<C: ConnectionTrait>(
    db: &C,
    caller: Uuid,
    id: Uuid,
) -> Result<note::Model, AppError> {
    let scope = policy::select_scope(db, caller, Table::Notes).await?;
    scope
        .apply(note::Entity::find_by_id(id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".into()))
}

/// Paginated, newest-first listing of the notes inside `scope`.
pub(crate) async fn list_scoped<C: ConnectionTrait>(
    db: &C,
    scope: Scope,
    query: &NoteListQuery,
) -> Result<NoteListResponse, AppError> {
    let (page, per_page) = page_bounds(query.page, query.per_page);

    let mut select = scope.apply(note::Entity::find());

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(note::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select.clone().paginate(db, per_page).num_items().await?;

    let data = select
        .order_by_desc(note::Column::CreatedAt)
        .order_by_desc(note::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(db)
        .await?
        .into_iter()
        .map(NoteResponse::from)
        .collect();

    Ok(NoteListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    })
}
