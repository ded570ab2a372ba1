use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const NAME_MAX_LEN: usize = 100;

/// Request body for sign-up.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password (6-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Display name (1-100 characters).
    #[schema(example = "Alice")]
    pub name: String,
}

/// Request body for password sign-in.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

/// Request body for requesting a magic link.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct MagicLinkRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// Request body for redeeming a magic link.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct VerifyMagicLinkRequest {
    /// Token from the magic link's `token` query parameter.
    pub token: String,
}

/// Trim and lowercase an email, then check its shape.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || email.chars().count() > EMAIL_MAX_LEN {
        return Err(AppError::Validation(
            "Email must be 1-254 characters".into(),
        ));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(
            "Password must be 6-128 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a trimmed display name (1-100 characters).
pub fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX_LEN {
        return Err(AppError::Validation("Name must be 1-100 characters".into()));
    }
    Ok(())
}

/// Validate a sign-up request. Returns the normalized email.
pub fn validate_signup_request(payload: &SignupRequest) -> Result<String, AppError> {
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;
    validate_name(&payload.name)?;
    Ok(email)
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<String, AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(payload.email.trim().to_lowercase())
}

/// Default display name for identities created through a magic link.
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    local.chars().take(NAME_MAX_LEN).collect()
}

/// An identity with its display name and roles.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Display name, if the identity has a profile.
    #[schema(example = "Alice")]
    pub name: Option<String>,
    #[schema(example = json!(["user"]))]
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

/// Successful sign-in response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    /// Bearer token for the new session.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// Acknowledgement for a magic-link request.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MagicLinkSentResponse {
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Current caller.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub session_expires_at: DateTime<Utc>,
}
