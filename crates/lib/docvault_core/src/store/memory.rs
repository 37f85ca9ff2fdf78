//! In-process store backend.
//!
//! All tables live behind one `RwLock`, so every trait method (cascades
//! included) observes and mutates a consistent snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::api_key::{ApiKeyRecord, ApiKeyState};
use crate::models::auth::{NewUser, SessionRecord, User, UserUpdate, UserWithPassword};
use crate::models::document::{Document, DocumentUpdate};
use crate::uuid::uuidv7;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserWithPassword>,
    sessions: HashMap<Uuid, SessionRecord>,
    api_keys: HashMap<Uuid, ApiKeyRecord>,
    documents: HashMap<Uuid, Document>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.user.email == email && Some(u.user.id) != except)
    }

    fn require_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::IntegrityViolation(format!(
                "user {user_id} does not exist"
            )))
        }
    }
}

/// Store backed by in-memory hash maps.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if t.email_taken(&new.email, None) {
            return Err(StoreError::Conflict("Email"));
        }
        let now = Utc::now();
        let user = User {
            id: uuidv7(),
            email: new.email,
            name: new.name,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(
            user.id,
            UserWithPassword {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_user_with_password(
        &self,
        id: Uuid,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.user.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = t.users.values().map(|u| u.user.clone()).collect();
        newest_first(&mut users, |u| (u.created_at, u.id));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if let Some(email) = &update.email
            && t.email_taken(email, Some(id))
        {
            return Err(StoreError::Conflict("Email"));
        }
        let row = t.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = update.email {
            row.user.email = email;
        }
        if let Some(name) = update.name {
            row.user.name = Some(name);
        }
        if let Some(role) = update.role {
            row.user.role = role;
        }
        if let Some(hash) = update.password_hash {
            row.password_hash = hash;
        }
        row.user.updated_at = Utc::now();
        Ok(row.user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        t.sessions.retain(|_, s| s.user_id != id);
        t.api_keys.retain(|_, k| k.user_id != id);
        t.documents.retain(|_, d| d.user_id != id);
        Ok(())
    }

    async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require_user(session.user_id)?;
        t.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        Ok(t.sessions.remove(&id).is_some())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - t.sessions.len()) as u64)
    }

    async fn insert_api_key(&self, key: &ApiKeyRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require_user(key.user_id)?;
        if t.api_keys.values().any(|k| k.secret_hash == key.secret_hash) {
            return Err(StoreError::Conflict("API key"));
        }
        t.api_keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn get_api_key(&self, id: Uuid) -> Result<Option<ApiKeyRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.api_keys.get(&id).cloned())
    }

    async fn find_api_key_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.api_keys.values().find(|k| k.secret_hash == hash).cloned())
    }

    async fn list_api_keys(&self, owner: Option<Uuid>) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let t = self.tables.read().await;
        let mut keys: Vec<ApiKeyRecord> = t
            .api_keys
            .values()
            .filter(|k| owner.is_none_or(|o| k.user_id == o))
            .cloned()
            .collect();
        newest_first(&mut keys, |k| (k.created_at, k.id));
        Ok(keys)
    }

    async fn revoke_api_key(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        match t.api_keys.get_mut(&id) {
            Some(key) => {
                key.state = ApiKeyState::Revoked;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if let Some(key) = t.api_keys.get_mut(&id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn delete_api_key(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        Ok(t.api_keys.remove(&id).is_some())
    }

    async fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require_user(document.user_id)?;
        t.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.documents.get(&id).cloned())
    }

    async fn list_documents(&self, owner: Option<Uuid>) -> Result<Vec<Document>, StoreError> {
        let t = self.tables.read().await;
        let mut docs: Vec<Document> = t
            .documents
            .values()
            .filter(|d| owner.is_none_or(|o| d.user_id == o))
            .cloned()
            .collect();
        newest_first(&mut docs, |d| (d.created_at, d.id));
        Ok(docs)
    }

    async fn update_document(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, StoreError> {
        let mut t = self.tables.write().await;
        let doc = t.documents.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = update.title {
            doc.title = title;
        }
        if let Some(file) = update.file {
            doc.file = Some(file);
        }
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        Ok(t.documents.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: None,
            password_hash: "hash".into(),
            role: Role::User,
        }
    }

    fn key_for(user_id: Uuid, hash: &str) -> ApiKeyRecord {
        ApiKeyRecord {
            id: uuidv7(),
            user_id,
            name: "k".into(),
            display_prefix: "sk_00000000...".into(),
            secret_hash: hash.into(),
            state: ApiKeyState::Active,
            created_at: Utc::now(),
            last_used_at: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("Email")));
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let b = store.create_user(new_user("b@example.com")).await.unwrap();
        let err = store
            .update_user(
                b.id,
                UserUpdate {
                    email: Some("a@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // Keeping one's own email is not a conflict.
        store
            .update_user(
                b.id,
                UserUpdate {
                    email: Some("b@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn child_rows_require_existing_user() {
        let store = MemoryStore::new();
        let err = store.insert_api_key(&key_for(uuidv7(), "h")).await.unwrap_err();
        assert!(matches!(err, StoreError::IntegrityViolation(_)));
    }

    #[tokio::test]
    async fn delete_user_cascades() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let key = key_for(user.id, "h1");
        store.insert_api_key(&key).await.unwrap();
        let now = Utc::now();
        let session = SessionRecord {
            id: uuidv7(),
            user_id: user.id,
            expires_at: now + Duration::hours(1),
            created_at: now,
        };
        store.insert_session(&session).await.unwrap();
        let doc = Document {
            id: uuidv7(),
            title: "t".into(),
            file: None,
            user_id: user.id,
            created_at: now,
            updated_at: now,
        };
        store.insert_document(&doc).await.unwrap();

        store.delete_user(user.id).await.unwrap();

        assert!(store.get_api_key(key.id).await.unwrap().is_none());
        assert!(store.get_session(session.id).await.unwrap().is_none());
        assert!(store.get_document(doc.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_user(user.id).await.unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[tokio::test]
    async fn revoke_after_delete_does_not_resurrect() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let key = key_for(user.id, "h1");
        store.insert_api_key(&key).await.unwrap();
        assert!(store.delete_api_key(key.id).await.unwrap());
        assert!(!store.revoke_api_key(key.id).await.unwrap());
        assert!(store.get_api_key(key.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let now = Utc::now();
        let live = SessionRecord {
            id: uuidv7(),
            user_id: user.id,
            expires_at: now + Duration::hours(1),
            created_at: now,
        };
        let dead = SessionRecord {
            id: uuidv7(),
            user_id: user.id,
            expires_at: now - Duration::hours(1),
            created_at: now - Duration::hours(2),
        };
        store.insert_session(&live).await.unwrap();
        store.insert_session(&dead).await.unwrap();
        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 1);
        assert!(store.get_session(live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user("a@example.com")).await.unwrap();
        let b = store.create_user(new_user("b@example.com")).await.unwrap();
        let k1 = key_for(a.id, "h1");
        let k2 = key_for(a.id, "h2");
        let k3 = key_for(b.id, "h3");
        for k in [&k1, &k2, &k3] {
            store.insert_api_key(k).await.unwrap();
        }
        let mine = store.list_api_keys(Some(a.id)).await.unwrap();
        assert_eq!(mine.iter().map(|k| k.id).collect::<Vec<_>>(), vec![k2.id, k1.id]);
        assert_eq!(store.list_api_keys(None).await.unwrap().len(), 3);
    }
}
