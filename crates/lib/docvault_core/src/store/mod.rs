//! Credential Store: durable CRUD for users, sessions, API keys and
//! documents.
//!
//! Each method is a single atomic operation against the backend. Deleting a
//! user removes its sessions, API keys and documents in the same step.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::api_key::ApiKeyRecord;
use crate::models::auth::{NewUser, SessionRecord, User, UserUpdate, UserWithPassword};
use crate::models::document::{Document, DocumentUpdate};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    /// A uniqueness constraint was violated; carries the field label.
    #[error("{0} already exists")]
    Conflict(&'static str),

    /// A referenced parent row is missing.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Shared handle to the active store backend.
pub type SharedStore = Arc<dyn CredentialStore>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    // -- users --------------------------------------------------------------

    /// Insert a user. Duplicate email → `Conflict("Email")`.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn get_user_with_password(
        &self,
        id: Uuid,
    ) -> Result<Option<UserWithPassword>, StoreError>;

    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, StoreError>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Apply a partial update and bump `updated_at`. Absent row → `NotFound`.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<User, StoreError>;

    /// Delete a user and cascade to its sessions, keys and documents.
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    // -- sessions -----------------------------------------------------------

    async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Remove sessions that expired before `now`; returns the count.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // -- api keys -----------------------------------------------------------

    async fn insert_api_key(&self, key: &ApiKeyRecord) -> Result<(), StoreError>;

    async fn get_api_key(&self, id: Uuid) -> Result<Option<ApiKeyRecord>, StoreError>;

    async fn find_api_key_by_hash(&self, hash: &str)
    -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Keys of one owner, or all keys when `owner` is `None`; newest first.
    async fn list_api_keys(&self, owner: Option<Uuid>) -> Result<Vec<ApiKeyRecord>, StoreError>;

    /// Move a key to `Revoked`. Returns whether the row exists.
    async fn revoke_api_key(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns whether a row was removed.
    async fn delete_api_key(&self, id: Uuid) -> Result<bool, StoreError>;

    // -- documents ----------------------------------------------------------

    async fn insert_document(&self, document: &Document) -> Result<(), StoreError>;

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Documents of one owner, or all documents when `owner` is `None`;
    /// newest first.
    async fn list_documents(&self, owner: Option<Uuid>) -> Result<Vec<Document>, StoreError>;

    async fn update_document(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError>;
}
