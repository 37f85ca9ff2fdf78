//! Account operations: signup, login, logout and self-service profile.

use tracing::{debug, info};

use super::gate::Identity;
use super::password::{hash_password, validate_password, verify_against_padding, verify_password};
use super::session::{self, OpenedSession};
use crate::config::SecurityConfig;
use crate::error::{VaultError, VaultResult};
use crate::models::auth::{NewUser, Role, User, UserUpdate};
use crate::store::SharedStore;

/// Longest accepted email address.
const MAX_EMAIL_LEN: usize = 254;

/// Longest accepted display name.
const MAX_NAME_LEN: usize = 100;

/// Signup / user-creation input.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Self-service profile changes. Changing the password requires the
/// current one.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Lowercase and trim an email, rejecting obviously malformed ones.
pub fn normalize_email(raw: &str) -> VaultResult<String> {
    let email = raw.trim().to_lowercase();
    let well_formed = email.len() <= MAX_EMAIL_LEN
        && !email.chars().any(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !well_formed {
        return Err(VaultError::Invalid("Invalid email address".into()));
    }
    Ok(email)
}

pub(crate) fn normalize_name(raw: Option<&str>) -> VaultResult<Option<String>> {
    let Some(name) = raw.map(str::trim) else {
        return Ok(None);
    };
    if name.is_empty() {
        return Ok(None);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(VaultError::Invalid(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(Some(name.to_string()))
}

/// Validate and insert an account with the given role.
pub(crate) async fn register(
    store: &SharedStore,
    account: &NewAccount,
    role: Role,
) -> VaultResult<User> {
    let email = normalize_email(&account.email)?;
    validate_password(&account.password)?;
    let user = store
        .create_user(NewUser {
            email,
            name: normalize_name(account.name.as_deref())?,
            password_hash: hash_password(&account.password)?,
            role,
        })
        .await?;
    Ok(user)
}

/// Create the bootstrap admin, or reset its password and role if the email
/// is already registered. Returns the user and whether it was created.
pub async fn seed_admin(
    store: &SharedStore,
    email: &str,
    password: &str,
) -> VaultResult<(User, bool)> {
    let email = normalize_email(email)?;
    validate_password(password)?;

    if let Some(existing) = store.find_user_by_email(&email).await? {
        let update = UserUpdate {
            role: Some(Role::Admin),
            password_hash: Some(hash_password(password)?),
            ..Default::default()
        };
        let user = store.update_user(existing.user.id, update).await?;
        info!(user_id = %user.id, "admin account reset");
        return Ok((user, false));
    }

    let account = NewAccount {
        email,
        password: password.to_string(),
        name: Some("Administrator".into()),
    };
    let user = register(store, &account, Role::Admin).await?;
    info!(user_id = %user.id, "admin account created");
    Ok((user, true))
}

/// Create a `user` account and open its first session.
pub async fn signup(
    store: &SharedStore,
    config: &SecurityConfig,
    account: &NewAccount,
) -> VaultResult<(User, OpenedSession)> {
    let user = register(store, account, Role::User).await?;
    let opened = session::open_session(store, config, user.id).await?;
    info!(user_id = %user.id, "user signed up");
    Ok((user, opened))
}

/// Check credentials and open a session.
///
/// Unknown email and wrong password fail identically.
pub async fn login(
    store: &SharedStore,
    config: &SecurityConfig,
    email: &str,
    password: &str,
) -> VaultResult<(User, OpenedSession)> {
    let email = email.trim().to_lowercase();

    let Some(found) = store.find_user_by_email(&email).await? else {
        verify_against_padding(password);
        debug!("login failed: unknown email");
        return Err(VaultError::Unauthenticated);
    };
    if !verify_password(password, &found.password_hash)? {
        debug!(user_id = %found.user.id, "login failed: wrong password");
        return Err(VaultError::Unauthenticated);
    }

    let opened = session::open_session(store, config, found.user.id).await?;
    info!(user_id = %found.user.id, "user logged in");
    Ok((found.user, opened))
}

/// End the session a token names. Unknown or invalid tokens are ignored.
pub async fn logout(store: &SharedStore, config: &SecurityConfig, token: &str) -> VaultResult<()> {
    if session::close_session(store, config, token).await? {
        debug!("session closed");
    }
    Ok(())
}

/// The caller's own account.
pub async fn profile(store: &SharedStore, identity: &Identity) -> VaultResult<User> {
    store
        .get_user(identity.user_id())
        .await?
        .ok_or(VaultError::Unauthenticated)
}

/// Apply self-service changes to the caller's account.
pub async fn update_profile(
    store: &SharedStore,
    identity: &Identity,
    changes: &ProfileUpdate,
) -> VaultResult<User> {
    let mut update = UserUpdate {
        email: changes.email.as_deref().map(normalize_email).transpose()?,
        name: normalize_name(changes.name.as_deref())?,
        ..Default::default()
    };

    if let Some(new_password) = changes.new_password.as_deref() {
        validate_password(new_password)?;
        let current = changes.current_password.as_deref().ok_or_else(|| {
            VaultError::Invalid("Current password is required to set a new one".into())
        })?;
        let found = store
            .get_user_with_password(identity.user_id())
            .await?
            .ok_or(VaultError::Unauthenticated)?;
        if !verify_password(current, &found.password_hash)? {
            return Err(VaultError::Invalid("Current password is incorrect".into()));
        }
        update.password_hash = Some(hash_password(new_password)?);
    }

    if update.is_empty() {
        return profile(store, identity).await;
    }
    let user = store.update_user(identity.user_id(), update).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}
