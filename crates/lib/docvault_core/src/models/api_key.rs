//! API key domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an API key. `Revoked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyState {
    Active,
    Revoked,
}

impl ApiKeyState {
    /// Normalise an `enabled` flag (`true` means usable).
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            ApiKeyState::Active
        } else {
            ApiKeyState::Revoked
        }
    }

    /// Normalise a `revoked` flag (`true` means unusable).
    pub fn from_revoked(revoked: bool) -> Self {
        Self::from_enabled(!revoked)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ApiKeyState::Active)
    }
}

/// Stored API key row. Holds only the keyed hash of the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// `sk_` + first 8 secret chars + `...`; fixed at creation.
    pub display_prefix: String,
    pub secret_hash: String,
    pub state: ApiKeyState,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// API key as shown to its owner or an admin. Never includes the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub display_prefix: String,
    pub state: ApiKeyState,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKeyRecord> for ApiKeyInfo {
    fn from(r: &ApiKeyRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name.clone(),
            display_prefix: r.display_prefix.clone(),
            state: r.state,
            created_at: r.created_at,
            last_used_at: r.last_used_at,
            expires_at: r.expires_at,
        }
    }
}

/// Result of key creation: the only time the raw secret is available.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub secret: String,
    pub info: ApiKeyInfo,
}

/// Admin listing entry.
#[derive(Debug, Clone)]
pub struct ApiKeyWithOwner {
    pub info: ApiKeyInfo,
    pub owner_email: Option<String>,
}

/// Why a presented key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidKeyReason {
    NotFound,
    Revoked,
    Expired,
}

/// Outcome of validating a bearer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyValidation {
    Valid { key_id: Uuid, user_id: Uuid },
    Invalid(InvalidKeyReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_flags_normalise_to_one_state() {
        assert_eq!(ApiKeyState::from_enabled(true), ApiKeyState::Active);
        assert_eq!(ApiKeyState::from_enabled(false), ApiKeyState::Revoked);
        assert_eq!(ApiKeyState::from_revoked(true), ApiKeyState::Revoked);
        assert_eq!(ApiKeyState::from_revoked(false), ApiKeyState::Active);
    }

    #[test]
    fn info_omits_hash() {
        let now = Utc::now();
        let record = ApiKeyRecord {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            name: "ci".into(),
            display_prefix: "sk_abcdef12...".into(),
            secret_hash: "deadbeef".into(),
            state: ApiKeyState::Active,
            created_at: now,
            last_used_at: None,
            expires_at: None,
        };
        let json = serde_json::to_string(&ApiKeyInfo::from(&record)).unwrap();
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("sk_abcdef12..."));
    }
}
