use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub use super::shared::{Pagination, escape_like, page_bounds};
use super::shared::double_option;

pub const TITLE_MAX_LEN: usize = 200;
pub const CONTENT_MAX_LEN: usize = 10_000;
/// Characters of a chat message's first line kept as the note title.
pub const CHAT_TITLE_LEN: usize = 50;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateNoteRequest {
    /// Title (1-200 characters after trimming).
    #[schema(example = "Groceries")]
    pub title: String,
    /// Body text (at most 10,000 characters).
    #[schema(example = "eggs, milk")]
    pub content: Option<String>,
}

/// A chat-style capture: one message becomes one note.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatNoteRequest {
    /// Message text (1-10,000 characters).
    #[schema(example = "remember to call the bank\nthey close at 5")]
    pub message: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    /// Absent leaves content unchanged; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub content: Option<Option<String>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NoteResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::note::Model> for NoteResponse {
    fn from(m: crate::entity::note::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            title: m.title,
            content: m.content,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NoteListResponse {
    pub data: Vec<NoteResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NoteListQuery {
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    pub per_page: Option<u64>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
}

/// Validate a trimmed title (1-200 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > TITLE_MAX_LEN {
        return Err(AppError::Validation(
            "Title must be 1-200 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_content(content: Option<&str>) -> Result<(), AppError> {
    if let Some(content) = content
        && content.chars().count() > CONTENT_MAX_LEN
    {
        return Err(AppError::Validation(
            "Content must be at most 10000 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_note(payload: &CreateNoteRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_content(payload.content.as_deref())
}

pub fn validate_update_note(payload: &UpdateNoteRequest) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        validate_title(title)?;
    }
    if let Some(ref content) = payload.content {
        validate_content(content.as_deref())?;
    }
    Ok(())
}

pub fn validate_chat_message(payload: &ChatNoteRequest) -> Result<(), AppError> {
    let len = payload.message.chars().count();
    if payload.message.trim().is_empty() || len > CONTENT_MAX_LEN {
        return Err(AppError::Validation(
            "Message must be 1-10000 characters".into(),
        ));
    }
    Ok(())
}

/// Title for a chat note: the message's first non-blank line, cut to
/// [`CHAT_TITLE_LEN`] characters with `…` appended when cut.
pub fn chat_title(message: &str) -> String {
    let line = message
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    if line.chars().count() <= CHAT_TITLE_LEN {
        return line.to_string();
    }
    let mut title: String = line.chars().take(CHAT_TITLE_LEN).collect();
    title.push('…');
    title
}
