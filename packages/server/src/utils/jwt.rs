use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use common::storage::{Bucket, ObjectKey};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims of a session bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid, // User ID
    pub sid: Uuid, // Session ID
    pub exp: usize,
}

/// Claims of a signed object URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectClaims {
    pub bucket: Bucket,
    pub key: String,
    pub exp: usize,
}

/// Sign a bearer token for an existing session row.
pub fn sign_session(
    user_id: Uuid,
    session_id: Uuid,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String> {
    let claims = SessionClaims {
        sub: user_id,
        sid: session_id,
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify a bearer token. Does not check the session row.
pub fn verify_session(token: &str, secret: &str) -> Result<SessionClaims> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Sign time-limited read access to one object. Returns the token and its expiry.
pub fn sign_object(
    bucket: Bucket,
    key: &ObjectKey,
    ttl_secs: u64,
    secret: &str,
) -> Result<(String, DateTime<Utc>)> {
    let ttl = i64::try_from(ttl_secs).context("signed URL TTL out of range")?;
    let expires_at = Utc::now()
        .checked_add_signed(Duration::seconds(ttl))
        .context("signed URL expiry out of range")?;

    let claims = ObjectClaims {
        bucket,
        key: key.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, expires_at))
}

/// Verify an object token with no expiry leeway.
pub fn verify_object(token: &str, secret: &str) -> Result<ObjectClaims> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<ObjectClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
