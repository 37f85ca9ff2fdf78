//! API key lifecycle.
//!
//! Long-lived bearer secrets for programmatic access. A key is shown in
//! full once, at creation; the store keeps only a peppered HMAC-SHA256 of
//! it plus a short display prefix. `Active` → `Revoked` is one-way.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::{Rng, rng};
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

use super::gate::{Identity, ensure_owner_or_admin};
use crate::config::SecurityConfig;
use crate::error::{VaultError, VaultResult};
use crate::models::api_key::{
    ApiKeyInfo, ApiKeyRecord, ApiKeyState, ApiKeyValidation, InvalidKeyReason, IssuedApiKey,
};
use crate::store::SharedStore;
use crate::uuid::uuidv7;

/// Fixed prefix of every key.
pub const KEY_PREFIX: &str = "sk_";

/// Random bytes per secret (256 bits).
const SECRET_BYTES: usize = 32;

/// Secret characters shown in the display prefix.
const DISPLAY_CHARS: usize = 8;

pub const MAX_KEY_NAME_LEN: usize = 100;

/// Generate a new secret: `sk_` followed by 64 hex characters.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rng().fill(&mut bytes);
    let body: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{KEY_PREFIX}{body}")
}

/// `sk_` + first 8 secret characters + `...`.
pub fn display_prefix(secret: &str) -> String {
    let body = secret.strip_prefix(KEY_PREFIX).unwrap_or(secret);
    let head: String = body.chars().take(DISPLAY_CHARS).collect();
    format!("{KEY_PREFIX}{head}...")
}

/// Keyed one-way hash of a secret, hex encoded.
pub fn hash_secret(pepper: &str, secret: &str) -> VaultResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(pepper.as_bytes())
        .map_err(|e| VaultError::Internal(format!("api key hmac: {e}")))?;
    mac.update(secret.as_bytes());
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

fn validate_name(raw: &str) -> VaultResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(VaultError::Invalid("API key name is required".into()));
    }
    if name.chars().count() > MAX_KEY_NAME_LEN {
        return Err(VaultError::Invalid(format!(
            "API key name must be at most {MAX_KEY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Issue a key for the caller. The returned secret is never available again.
pub async fn create_api_key(
    store: &SharedStore,
    config: &SecurityConfig,
    identity: &Identity,
    name: &str,
    expires_at: Option<DateTime<Utc>>,
) -> VaultResult<IssuedApiKey> {
    let name = validate_name(name)?;
    let now = Utc::now();
    if let Some(at) = expires_at
        && at <= now
    {
        return Err(VaultError::Invalid("Expiry must be in the future".into()));
    }

    let secret = generate_secret();
    let record = ApiKeyRecord {
        id: uuidv7(),
        user_id: identity.user_id(),
        name,
        display_prefix: display_prefix(&secret),
        secret_hash: hash_secret(&config.api_key_pepper, &secret)?,
        state: ApiKeyState::Active,
        created_at: now,
        last_used_at: None,
        expires_at,
    };
    store.insert_api_key(&record).await?;
    info!(user_id = %record.user_id, key_id = %record.id, "api key issued");

    Ok(IssuedApiKey {
        secret,
        info: ApiKeyInfo::from(&record),
    })
}

/// Check a presented key.
///
/// Every input takes the same path (hash, then one lookup by hash) before
/// the outcome is classified. On success `last_used_at` is bumped in the
/// background.
pub async fn validate_api_key(
    store: &SharedStore,
    config: &SecurityConfig,
    presented: &str,
) -> VaultResult<ApiKeyValidation> {
    let hash = hash_secret(&config.api_key_pepper, presented.trim())?;
    let record = store.find_api_key_by_hash(&hash).await?;
    let now = Utc::now();

    let outcome = match record {
        None => ApiKeyValidation::Invalid(InvalidKeyReason::NotFound),
        Some(r) if !r.state.is_active() => ApiKeyValidation::Invalid(InvalidKeyReason::Revoked),
        Some(r) if r.expires_at.is_some_and(|at| at <= now) => {
            ApiKeyValidation::Invalid(InvalidKeyReason::Expired)
        }
        Some(r) => {
            let store = Arc::clone(store);
            let key_id = r.id;
            tokio::spawn(async move {
                if let Err(e) = store.touch_api_key(key_id, now).await {
                    warn!(key_id = %key_id, error = %e, "failed to record api key use");
                }
            });
            ApiKeyValidation::Valid {
                key_id: r.id,
                user_id: r.user_id,
            }
        }
    };
    Ok(outcome)
}

async fn load_for(
    store: &SharedStore,
    identity: &Identity,
    key_id: Uuid,
) -> VaultResult<ApiKeyRecord> {
    let record = store
        .get_api_key(key_id)
        .await?
        .ok_or_else(|| VaultError::NotFound("API key not found".into()))?;
    ensure_owner_or_admin(identity, record.user_id, "API key")?;
    Ok(record)
}

/// The caller's own keys, newest first.
pub async fn list_api_keys(store: &SharedStore, identity: &Identity) -> VaultResult<Vec<ApiKeyInfo>> {
    let records = store.list_api_keys(Some(identity.user_id())).await?;
    Ok(records.iter().map(ApiKeyInfo::from).collect())
}

pub async fn get_api_key(
    store: &SharedStore,
    identity: &Identity,
    key_id: Uuid,
) -> VaultResult<ApiKeyInfo> {
    Ok(ApiKeyInfo::from(&load_for(store, identity, key_id).await?))
}

/// Revoke a key. Revoking a revoked key succeeds without change.
pub async fn revoke_api_key(
    store: &SharedStore,
    identity: &Identity,
    key_id: Uuid,
) -> VaultResult<ApiKeyInfo> {
    let mut record = load_for(store, identity, key_id).await?;
    if record.state.is_active() {
        if !store.revoke_api_key(key_id).await? {
            return Err(VaultError::NotFound("API key not found".into()));
        }
        record.state = ApiKeyState::Revoked;
        info!(key_id = %key_id, by = %identity.user_id(), "api key revoked");
    }
    Ok(ApiKeyInfo::from(&record))
}

/// Hard-delete a key.
pub async fn delete_api_key(
    store: &SharedStore,
    identity: &Identity,
    key_id: Uuid,
) -> VaultResult<()> {
    load_for(store, identity, key_id).await?;
    if !store.delete_api_key(key_id).await? {
        return Err(VaultError::NotFound("API key not found".into()));
    }
    info!(key_id = %key_id, by = %identity.user_id(), "api key deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_shape() {
        let secret = generate_secret();
        assert!(secret.starts_with(KEY_PREFIX));
        assert_eq!(secret.len(), KEY_PREFIX.len() + SECRET_BYTES * 2);
        assert!(secret[KEY_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_secret());
    }

    #[test]
    fn display_prefix_shows_eight_chars() {
        assert_eq!(display_prefix("sk_0123456789abcdef"), "sk_01234567...");
    }

    #[test]
    fn hash_is_keyed() {
        let secret = generate_secret();
        let a = hash_secret("pepper-a", &secret).unwrap();
        let b = hash_secret("pepper-b", &secret).unwrap();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, hash_secret("pepper-a", &secret).unwrap());
        assert!(!a.contains(&secret[KEY_PREFIX.len()..]));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  ci  ").unwrap(), "ci");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_KEY_NAME_LEN + 1)).is_err());
    }
}
