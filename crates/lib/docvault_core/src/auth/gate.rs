//! Authorization gate.
//!
//! Every privileged operation receives an [`Identity`] or an
//! [`AdminIdentity`]. Both can only be produced here (or by the session and
//! API key resolvers in this module tree), so holding one proves the check
//! already ran.

use tracing::debug;
use uuid::Uuid;

use super::{api_keys, session};
use crate::config::SecurityConfig;
use crate::error::{VaultError, VaultResult};
use crate::models::api_key::ApiKeyValidation;
use crate::models::auth::Role;
use crate::store::SharedStore;

/// How the caller proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Session { session_id: Uuid },
    ApiKey { key_id: Uuid },
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: Uuid,
    role: Role,
    method: AuthMethod,
}

impl Identity {
    pub(crate) fn new(user_id: Uuid, role: Role, method: AuthMethod) -> Self {
        Self {
            user_id,
            role,
            method,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An authenticated caller whose role is `admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity(Identity);

impl AdminIdentity {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }
}

impl TryFrom<Identity> for AdminIdentity {
    type Error = VaultError;

    fn try_from(identity: Identity) -> Result<Self, Self::Error> {
        if identity.is_admin() {
            Ok(Self(identity))
        } else {
            Err(VaultError::Forbidden("Admin role required".into()))
        }
    }
}

/// Credentials extracted from an inbound request by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    pub session_token: Option<String>,
    pub api_key: Option<String>,
}

impl RequestCredentials {
    pub fn session(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
            api_key: None,
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            session_token: None,
            api_key: Some(key.into()),
        }
    }
}

/// Resolve credentials to an identity.
///
/// The session token is tried first; if it does not resolve, the API key
/// is tried. Invalid credentials yield `Ok(None)`.
pub async fn resolve_identity(
    store: &SharedStore,
    config: &SecurityConfig,
    credentials: &RequestCredentials,
) -> VaultResult<Option<Identity>> {
    if let Some(token) = credentials.session_token.as_deref()
        && let Some(identity) = session::resolve_session(store, config, token).await?
    {
        return Ok(Some(identity));
    }

    if let Some(key) = credentials.api_key.as_deref() {
        match api_keys::validate_api_key(store, config, key).await? {
            ApiKeyValidation::Valid { key_id, user_id } => {
                let Some(user) = store.get_user(user_id).await? else {
                    return Ok(None);
                };
                return Ok(Some(Identity::new(
                    user.id,
                    user.role,
                    AuthMethod::ApiKey { key_id },
                )));
            }
            ApiKeyValidation::Invalid(reason) => {
                debug!(?reason, "api key rejected");
            }
        }
    }

    Ok(None)
}

/// Fails with `Unauthenticated` unless the credentials resolve.
pub async fn require_authenticated(
    store: &SharedStore,
    config: &SecurityConfig,
    credentials: &RequestCredentials,
) -> VaultResult<Identity> {
    resolve_identity(store, config, credentials)
        .await?
        .ok_or(VaultError::Unauthenticated)
}

/// Fails with `Unauthenticated` without an identity, `Forbidden` for a
/// non-admin one.
pub async fn require_admin(
    store: &SharedStore,
    config: &SecurityConfig,
    credentials: &RequestCredentials,
) -> VaultResult<AdminIdentity> {
    let identity = require_authenticated(store, config, credentials).await?;
    AdminIdentity::try_from(identity)
}

/// Pass if `identity` owns the resource or is an admin.
pub fn ensure_owner_or_admin(identity: &Identity, owner_id: Uuid, what: &str) -> VaultResult<()> {
    if identity.user_id == owner_id || identity.is_admin() {
        Ok(())
    } else {
        Err(VaultError::AccessDenied(format!(
            "You do not have access to this {what}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uuid::uuidv7;

    fn identity(role: Role) -> Identity {
        Identity::new(
            uuidv7(),
            role,
            AuthMethod::Session {
                session_id: uuidv7(),
            },
        )
    }

    #[test]
    fn admin_identity_requires_admin_role() {
        assert!(AdminIdentity::try_from(identity(Role::Admin)).is_ok());
        assert!(matches!(
            AdminIdentity::try_from(identity(Role::User)),
            Err(VaultError::Forbidden(_))
        ));
    }

    #[test]
    fn owner_passes_stranger_is_denied_admin_passes() {
        let owner = identity(Role::User);
        let stranger = identity(Role::User);
        let admin = identity(Role::Admin);

        assert!(ensure_owner_or_admin(&owner, owner.user_id(), "document").is_ok());
        assert!(matches!(
            ensure_owner_or_admin(&stranger, owner.user_id(), "document"),
            Err(VaultError::AccessDenied(_))
        ));
        assert!(ensure_owner_or_admin(&admin, owner.user_id(), "document").is_ok());
    }
}
