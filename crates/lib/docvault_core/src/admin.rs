//! Admin operations over every user's accounts, keys and documents.
//!
//! Each entry point takes an [`AdminIdentity`], which only the
//! authorization gate can produce.

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::accounts::{NewAccount, normalize_email, normalize_name, register};
use crate::auth::password::{hash_password, validate_password};
use crate::auth::{AdminIdentity, api_keys};
use crate::documents;
use crate::error::{VaultError, VaultResult};
use crate::models::api_key::{ApiKeyInfo, ApiKeyWithOwner};
use crate::models::auth::{Role, User, UserUpdate};
use crate::models::document::DocumentWithOwner;
use crate::storage::ObjectStorage;
use crate::store::{SharedStore, StoreError};

/// Admin edits to a user. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

fn user_not_found() -> VaultError {
    VaultError::NotFound("User not found".into())
}

async fn owner_emails(store: &SharedStore) -> VaultResult<HashMap<Uuid, String>> {
    Ok(store
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u.email))
        .collect())
}

pub async fn list_users(store: &SharedStore, _admin: &AdminIdentity) -> VaultResult<Vec<User>> {
    Ok(store.list_users().await?)
}

pub async fn get_user(
    store: &SharedStore,
    _admin: &AdminIdentity,
    user_id: Uuid,
) -> VaultResult<User> {
    store.get_user(user_id).await?.ok_or_else(user_not_found)
}

pub async fn create_user(
    store: &SharedStore,
    admin: &AdminIdentity,
    account: &NewAccount,
    role: Role,
) -> VaultResult<User> {
    let user = register(store, account, role).await?;
    info!(user_id = %user.id, role = %user.role, by = %admin.user_id(), "user created by admin");
    Ok(user)
}

pub async fn update_user(
    store: &SharedStore,
    admin: &AdminIdentity,
    user_id: Uuid,
    changes: &AdminUserUpdate,
) -> VaultResult<User> {
    let mut update = UserUpdate {
        email: changes.email.as_deref().map(normalize_email).transpose()?,
        name: normalize_name(changes.name.as_deref())?,
        role: changes.role,
        password_hash: None,
    };
    if let Some(password) = changes.password.as_deref() {
        validate_password(password)?;
        update.password_hash = Some(hash_password(password)?);
    }

    if update.is_empty() {
        return get_user(store, admin, user_id).await;
    }
    let user = store.update_user(user_id, update).await.map_err(|e| match e {
        StoreError::NotFound => user_not_found(),
        other => other.into(),
    })?;
    info!(user_id = %user.id, by = %admin.user_id(), "user updated by admin");
    Ok(user)
}

/// Delete a user and everything it owns. Admins cannot delete themselves.
///
/// The user's blobs are deleted after the rows are gone; failures there
/// are logged and leave orphaned blobs only.
pub async fn delete_user(
    store: &SharedStore,
    storage: &dyn ObjectStorage,
    admin: &AdminIdentity,
    user_id: Uuid,
) -> VaultResult<()> {
    if user_id == admin.user_id() {
        return Err(VaultError::Invalid(
            "You cannot delete your own account".into(),
        ));
    }
    if store.get_user(user_id).await?.is_none() {
        return Err(user_not_found());
    }

    let blob_keys: Vec<String> = store
        .list_documents(Some(user_id))
        .await?
        .into_iter()
        .filter_map(|d| d.file.map(|f| f.key))
        .collect();

    store.delete_user(user_id).await.map_err(|e| match e {
        StoreError::NotFound => user_not_found(),
        other => other.into(),
    })?;
    info!(user_id = %user_id, by = %admin.user_id(), blobs = blob_keys.len(), "user deleted by admin");

    for key in blob_keys {
        if let Err(e) = storage.delete_blob(&key).await {
            warn!(user_id = %user_id, key = %key, error = %e, "failed to delete blob of deleted user");
        }
    }
    Ok(())
}

/// Every API key, newest first, with owner email.
pub async fn list_api_keys(
    store: &SharedStore,
    _admin: &AdminIdentity,
) -> VaultResult<Vec<ApiKeyWithOwner>> {
    let emails = owner_emails(store).await?;
    Ok(store
        .list_api_keys(None)
        .await?
        .iter()
        .map(|r| ApiKeyWithOwner {
            info: ApiKeyInfo::from(r),
            owner_email: emails.get(&r.user_id).cloned(),
        })
        .collect())
}

pub async fn revoke_api_key(
    store: &SharedStore,
    admin: &AdminIdentity,
    key_id: Uuid,
) -> VaultResult<ApiKeyInfo> {
    api_keys::revoke_api_key(store, admin.identity(), key_id).await
}

pub async fn delete_api_key(
    store: &SharedStore,
    admin: &AdminIdentity,
    key_id: Uuid,
) -> VaultResult<()> {
    api_keys::delete_api_key(store, admin.identity(), key_id).await
}

/// Every document, newest first, with owner email.
pub async fn list_documents(
    store: &SharedStore,
    _admin: &AdminIdentity,
) -> VaultResult<Vec<DocumentWithOwner>> {
    let emails = owner_emails(store).await?;
    Ok(store
        .list_documents(None)
        .await?
        .into_iter()
        .map(|document| {
            let owner_email = emails.get(&document.user_id).cloned();
            DocumentWithOwner {
                document,
                owner_email,
            }
        })
        .collect())
}

pub async fn delete_document(
    store: &SharedStore,
    storage: &dyn ObjectStorage,
    admin: &AdminIdentity,
    document_id: Uuid,
) -> VaultResult<()> {
    documents::delete_document(store, storage, admin.identity(), document_id).await
}
