//! Session tokens.
//!
//! A session is a stored row plus an HS256 token naming it. Resolution
//! checks the signature, the expiry, the row and the user, and re-reads the
//! role every time. Any failed check resolves to `None`.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use super::gate::{AuthMethod, Identity};
use crate::config::SecurityConfig;
use crate::error::{VaultError, VaultResult};
use crate::models::auth::{SessionClaims, SessionRecord};
use crate::store::SharedStore;
use crate::uuid::uuidv7;

/// A freshly opened session.
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Create a session row for `user_id` and sign a token for it.
pub async fn open_session(
    store: &SharedStore,
    config: &SecurityConfig,
    user_id: Uuid,
) -> VaultResult<OpenedSession> {
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(config.session_ttl)
        .ok_or_else(|| VaultError::Internal("session lifetime out of range".into()))?;
    let record = SessionRecord {
        id: uuidv7(),
        user_id,
        expires_at,
        created_at: now,
    };
    store.insert_session(&record).await?;
    let token = sign(&record, config.session_secret.as_bytes())?;
    debug!(user_id = %user_id, session_id = %record.id, "session opened");
    Ok(OpenedSession {
        token,
        expires_at: record.expires_at,
    })
}

/// Resolve a session token to an identity.
///
/// Tampered, expired, revoked and orphaned tokens all give `Ok(None)`.
pub async fn resolve_session(
    store: &SharedStore,
    config: &SecurityConfig,
    token: &str,
) -> VaultResult<Option<Identity>> {
    let Some((user_id, session_id)) = verify(token, config.session_secret.as_bytes(), true)
    else {
        return Ok(None);
    };
    let Some(session) = store.get_session(session_id).await? else {
        return Ok(None);
    };
    if session.user_id != user_id || session.expires_at <= Utc::now() {
        return Ok(None);
    }
    let Some(user) = store.get_user(user_id).await? else {
        return Ok(None);
    };
    Ok(Some(Identity::new(
        user.id,
        user.role,
        AuthMethod::Session { session_id },
    )))
}

/// Delete the session a token names. Returns whether a row was removed.
///
/// Expired tokens still close their row; unverifiable ones are ignored.
pub async fn close_session(
    store: &SharedStore,
    config: &SecurityConfig,
    token: &str,
) -> VaultResult<bool> {
    let Some((_, session_id)) = verify(token, config.session_secret.as_bytes(), false) else {
        return Ok(false);
    };
    Ok(store.delete_session(session_id).await?)
}

fn sign(record: &SessionRecord, secret: &[u8]) -> VaultResult<String> {
    let claims = SessionClaims {
        sub: record.user_id.to_string(),
        sid: record.id.to_string(),
        iat: record.created_at.timestamp(),
        exp: record.expires_at.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| VaultError::Internal(format!("session token encode: {e}")))
}

fn verify(token: &str, secret: &[u8], check_expiry: bool) -> Option<(Uuid, Uuid)> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = check_expiry;
    let claims = decode::<SessionClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .ok()?
        .claims;
    let user_id = Uuid::parse_str(&claims.sub).ok()?;
    let session_id = Uuid::parse_str(&claims.sid).ok()?;
    Some((user_id, session_id))
}
