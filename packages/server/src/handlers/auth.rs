use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{Duration, Utc};
use futures::{Stream, StreamExt};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tokio_stream::wrappers::BroadcastStream;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::{magic_link, profile, session, user, user_role};
use crate::error::{AppError, ErrorBody};
use crate::events::{AuthEvent, AuthEventKind};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    LoginRequest, MagicLinkRequest, MagicLinkSentResponse, MeResponse, SessionResponse,
    SignupRequest, UserResponse, VerifyMagicLinkRequest, name_from_email, normalize_email,
    validate_login_request, validate_signup_request,
};
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/signup",
    tag = "Auth",
    operation_id = "signup",
    summary = "Create an account",
    description = "Creates an identity with a password and a profile. The very first identity \
        is assigned the `admin` role; every later one gets `user`.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = validate_signup_request(&payload)?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .count(&state.db)
        .await?;
    if existing > 0 {
        return Err(AppError::EmailTaken);
    }

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let txn = state.db.begin().await?;
    let user = create_identity(&txn, &email, Some(hash), payload.name.trim()).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.id, "Account created");
    let body = user_response(&state.db, user).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Sign in with email and password",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = validate_login_request(&payload)?;

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let Some(ref phc) = user.password else {
        return Err(AppError::InvalidCredentials);
    };
    let is_valid = hash::verify_password(&payload.password, phc)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(start_session(&state, user).await?))
}

#[utoipa::path(
    post,
    path = "/magic-link",
    tag = "Auth",
    operation_id = "requestMagicLink",
    summary = "Send a passwordless sign-in link",
    description = "Issues a single-use sign-in token and delivers a link containing it. \
        Works whether or not an account exists for the address.",
    request_body = MagicLinkRequest,
    responses(
        (status = 202, description = "Link sent", body = MagicLinkSentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn request_magic_link(
    State(state): State<AppState>,
    AppJson(payload): AppJson<MagicLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email)?;

    let token = hash::generate_token();
    let now = Utc::now();
    let expires_at = now + Duration::minutes(state.config.auth.magic_link_ttl_minutes);

    magic_link::ActiveModel {
        id: Set(Uuid::now_v7()),
        email: Set(email.clone()),
        token_hash: Set(hash::token_digest(&token)),
        created_at: Set(now),
        expires_at: Set(expires_at),
        consumed_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let link = format!("{}?token={}", state.config.auth.magic_link_redirect_url, token);
    state
        .mailer
        .send(&email, &link)
        .await
        .map_err(|e| AppError::Internal(format!("Magic link delivery failed: {e}")))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MagicLinkSentResponse { email, expires_at }),
    ))
}

#[utoipa::path(
    post,
    path = "/magic-link/verify",
    tag = "Auth",
    operation_id = "verifyMagicLink",
    summary = "Redeem a magic-link token",
    description = "Exchanges a magic-link token for a session. Creates the account on first \
        use, with the email's local part as its display name. Each token works once.",
    request_body = VerifyMagicLinkRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Unknown, used or expired token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn verify_magic_link(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyMagicLinkRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let digest = hash::token_digest(payload.token.trim());
    let now = Utc::now();

    let txn = state.db.begin().await?;

    let link = magic_link::Entity::find()
        .filter(magic_link::Column::TokenHash.eq(&digest))
        .one(&txn)
        .await?
        .filter(|l| l.consumed_at.is_none() && l.expires_at > now)
        .ok_or(AppError::TokenInvalid)?;

    // Conditional update so two concurrent redemptions cannot both win.
    let claimed = magic_link::Entity::update_many()
        .col_expr(magic_link::Column::ConsumedAt, Expr::value(now))
        .filter(magic_link::Column::Id.eq(link.id))
        .filter(magic_link::Column::ConsumedAt.is_null())
        .exec(&txn)
        .await?;
    if claimed.rows_affected != 1 {
        return Err(AppError::TokenInvalid);
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&link.email))
        .one(&txn)
        .await?;
    let user = match existing {
        Some(user) => user,
        None => {
            let user =
                create_identity(&txn, &link.email, None, &name_from_email(&link.email)).await?;
            tracing::info!(user_id = %user.id, "Account created from magic link");
            user
        }
    };

    txn.commit().await?;

    Ok(Json(start_session(&state, user).await?))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Revoke the current session",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    session::Entity::update_many()
        .col_expr(session::Column::RevokedAt, Expr::value(Utc::now()))
        .filter(session::Column::Id.eq(auth_user.session_id))
        .exec(&state.db)
        .await?;

    publish(&state, auth_user.user_id, AuthEventKind::SignedOut);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current user",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    Ok(Json(MeResponse {
        user: user_response(&state.db, user).await?,
        session_expires_at: auth_user.session_expires_at,
    }))
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "Auth",
    operation_id = "authEvents",
    summary = "Stream auth state changes",
    description = "Server-sent events for the caller's own sign-in, sign-out and profile \
        updates. The event name is the kind (`SIGNED_IN`, `SIGNED_OUT`, `USER_UPDATED`).",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = AuthEvent),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn events(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = auth_user.user_id;
    let rx = state.auth_events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |res| async move {
        match res {
            Ok(evt) if evt.user_id == user_id => {
                let data = serde_json::to_string(&evt).ok()?;
                Some(Ok(Event::default().event(evt.kind.as_str()).data(data)))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(%user_id, "Auth event subscriber lagged: {e}");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Insert an identity and its profile. The role is assigned by the
/// identity's insert trigger on the same connection.
async fn create_identity<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: Option<String>,
    name: &str,
) -> Result<user::Model, AppError> {
    let now = Utc::now();
    let user = user::ActiveModel {
        id: Set(Uuid::now_v7()),
        email: Set(email.to_string()),
        password: Set(password),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Signup race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    profile::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user.id),
        name: Set(name.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(user)
}

/// Open a session row for `user` and sign a bearer token for it.
async fn start_session(state: &AppState, user: user::Model) -> Result<SessionResponse, AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(state.config.auth.session_ttl_hours);

    let session = session::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user.id),
        created_at: Set(now),
        expires_at: Set(expires_at),
        revoked_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let token = jwt::sign_session(user.id, session.id, expires_at, &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    publish(state, user.id, AuthEventKind::SignedIn);

    Ok(SessionResponse {
        token,
        expires_at,
        user: user_response(&state.db, user).await?,
    })
}

/// Publish an auth event. Having no subscribers is not an error.
pub(crate) fn publish(state: &AppState, user_id: Uuid, kind: AuthEventKind) {
    let _ = state.auth_events.send(AuthEvent::new(user_id, kind));
}

/// Assemble the public view of an identity: profile name and current roles.
pub(crate) async fn user_response<C: ConnectionTrait>(
    db: &C,
    user: user::Model,
) -> Result<UserResponse, DbErr> {
    let name = profile::Entity::find()
        .filter(profile::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .map(|p| p.name);

    let roles = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user.id))
        .order_by_asc(user_role::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.role)
        .collect();

    Ok(UserResponse {
        id: user.id,
        email: user.email,
        name,
        roles,
        created_at: user.created_at,
    })
}
