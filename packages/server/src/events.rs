//! Auth state-change notifications.
//!
//! Sign-in, sign-out and profile updates are published on a broadcast
//! channel; clients follow their own events over SSE.

use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    UserUpdated,
}

impl AuthEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::UserUpdated => "USER_UPDATED",
        }
    }
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct AuthEvent {
    pub user_id: Uuid,
    pub kind: AuthEventKind,
}

impl AuthEvent {
    pub fn new(user_id: Uuid, kind: AuthEventKind) -> Self {
        Self { user_id, kind }
    }
}

/// Capacity of the auth event channel. Slow subscribers skip ahead.
pub const CHANNEL_CAPACITY: usize = 256;
