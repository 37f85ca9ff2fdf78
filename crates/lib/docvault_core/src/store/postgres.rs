//! PostgreSQL store backend.
//!
//! Referential integrity lives in the schema (`ON DELETE CASCADE` on every
//! child table), so a user delete is one statement.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::api_key::{ApiKeyRecord, ApiKeyState};
use crate::models::auth::{NewUser, Role, SessionRecord, User, UserUpdate, UserWithPassword};
use crate::models::document::{Document, DocumentUpdate, StoredFile};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at, password_hash";

const API_KEY_COLUMNS: &str = "id, user_id, name, display_prefix, secret_hash, enabled, \
     created_at, last_used_at, expires_at";

const DOCUMENT_COLUMNS: &str = "id, title, file_key, file_name, content_type, file_size, \
     user_id, created_at, updated_at";

type UserRow = (
    Uuid,
    String,
    Option<String>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
);

type ApiKeyRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    bool,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

type DocumentRow = (
    Uuid,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn user_from_row(row: UserRow) -> UserWithPassword {
    let (id, email, name, role, created_at, updated_at, password_hash) = row;
    UserWithPassword {
        user: User {
            id,
            email,
            name,
            // The column carries a CHECK constraint; fall back to the
            // least privileged role rather than failing the read.
            role: role.parse().unwrap_or(Role::User),
            created_at,
            updated_at,
        },
        password_hash,
    }
}

fn api_key_from_row(row: ApiKeyRow) -> ApiKeyRecord {
    let (id, user_id, name, display_prefix, secret_hash, enabled, created_at, last_used_at, expires_at) =
        row;
    ApiKeyRecord {
        id,
        user_id,
        name,
        display_prefix,
        secret_hash,
        state: ApiKeyState::from_enabled(enabled),
        created_at,
        last_used_at,
        expires_at,
    }
}

fn document_from_row(row: DocumentRow) -> Document {
    let (id, title, file_key, file_name, content_type, file_size, user_id, created_at, updated_at) =
        row;
    let file = match (file_key, file_name, content_type, file_size) {
        (Some(key), Some(name), Some(content_type), Some(size)) => Some(StoredFile {
            key,
            name,
            content_type,
            size,
        }),
        _ => None,
    };
    Document {
        id,
        title,
        file,
        user_id,
        created_at,
        updated_at,
    }
}

/// Translate constraint violations into store errors.
fn map_write_error(e: sqlx::Error, unique_field: &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(unique_field);
        }
        if db.is_foreign_key_violation() {
            return StoreError::IntegrityViolation(db.message().to_string());
        }
    }
    StoreError::Database(e)
}

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run the migrations embedded from `docvault_core/migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, email, name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(uuidv7())
            .bind(&new.email)
            .bind(&new.name)
            .bind(&new.password_hash)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Email"))?;
        Ok(user_from_row(row).user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.get_user_with_password(id).await?.map(|u| u.user))
    }

    async fn get_user_with_password(
        &self,
        id: Uuid,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(user_from_row))
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(user_from_row))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| user_from_row(r).user).collect())
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET \
               email = COALESCE($2, email), \
               name = COALESCE($3, name), \
               role = COALESCE($4, role), \
               password_hash = COALESCE($5, password_hash), \
               updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&update.email)
            .bind(&update.name)
            .bind(update.role.map(|r| r.as_str()))
            .bind(&update.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Email"))?;
        row.map(|r| user_from_row(r).user).ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Session"))?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, user_id, expires_at, created_at)| SessionRecord {
            id,
            user_id,
            expires_at,
            created_at,
        }))
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_api_key(&self, key: &ApiKeyRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO api_keys \
               (id, user_id, name, display_prefix, secret_hash, enabled, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(key.id)
        .bind(key.user_id)
        .bind(&key.name)
        .bind(&key.display_prefix)
        .bind(&key.secret_hash)
        .bind(key.state.is_active())
        .bind(key.created_at)
        .bind(key.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "API key"))?;
        Ok(())
    }

    async fn get_api_key(&self, id: Uuid) -> Result<Option<ApiKeyRecord>, StoreError> {
        let sql = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1");
        let row = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(api_key_from_row))
    }

    async fn find_api_key_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let sql = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE secret_hash = $1");
        let row = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(api_key_from_row))
    }

    async fn list_api_keys(&self, owner: Option<Uuid>) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let sql = format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(api_key_from_row).collect())
    }

    async fn revoke_api_key(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE api_keys SET enabled = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_api_key(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        let file = document.file.as_ref();
        sqlx::query(
            "INSERT INTO documents \
               (id, title, file_key, file_name, content_type, file_size, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(file.map(|f| f.key.as_str()))
        .bind(file.map(|f| f.name.as_str()))
        .bind(file.map(|f| f.content_type.as_str()))
        .bind(file.map(|f| f.size))
        .bind(document.user_id)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Document"))?;
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(document_from_row))
    }

    async fn list_documents(&self, owner: Option<Uuid>) -> Result<Vec<Document>, StoreError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(document_from_row).collect())
    }

    async fn update_document(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, StoreError> {
        let file = update.file.as_ref();
        let sql = format!(
            "UPDATE documents SET \
               title = COALESCE($2, title), \
               file_key = COALESCE($3, file_key), \
               file_name = COALESCE($4, file_name), \
               content_type = COALESCE($5, content_type), \
               file_size = COALESCE($6, file_size), \
               updated_at = now() \
             WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(&update.title)
            .bind(file.map(|f| f.key.as_str()))
            .bind(file.map(|f| f.name.as_str()))
            .bind(file.map(|f| f.content_type.as_str()))
            .bind(file.map(|f| f.size))
            .fetch_optional(&self.pool)
            .await?;
        row.map(document_from_row).ok_or(StoreError::NotFound)
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
