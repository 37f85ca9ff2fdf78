//! Document operations.
//!
//! A document row owns at most one blob reference. Upload is a two-step
//! flow: the client asks for a presigned upload URL, PUTs the bytes to
//! storage, then attaches the resulting key. A document whose client never
//! attaches simply has no file.

pub mod policy;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Identity, ensure_owner_or_admin};
use crate::error::{VaultError, VaultResult};
use crate::models::document::{Document, DocumentUpdate, StoredFile, UploadTicket};
use crate::storage::ObjectStorage;
use crate::store::SharedStore;
use crate::uuid::uuidv7;

/// Client-reported metadata of an uploaded blob.
#[derive(Debug, Clone)]
pub struct AttachFile {
    pub file_key: String,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
}

fn not_found() -> VaultError {
    VaultError::NotFound("Document not found".into())
}

async fn load_for(
    store: &SharedStore,
    identity: &Identity,
    document_id: Uuid,
) -> VaultResult<Document> {
    let document = store.get_document(document_id).await?.ok_or_else(not_found)?;
    ensure_owner_or_admin(identity, document.user_id, "document")?;
    Ok(document)
}

/// The caller's own documents, newest first.
pub async fn list_documents(store: &SharedStore, identity: &Identity) -> VaultResult<Vec<Document>> {
    Ok(store.list_documents(Some(identity.user_id())).await?)
}

pub async fn get_document(
    store: &SharedStore,
    identity: &Identity,
    document_id: Uuid,
) -> VaultResult<Document> {
    load_for(store, identity, document_id).await
}

pub async fn create_document(
    store: &SharedStore,
    identity: &Identity,
    title: &str,
) -> VaultResult<Document> {
    let now = Utc::now();
    let document = Document {
        id: uuidv7(),
        title: policy::validate_title(title)?,
        file: None,
        user_id: identity.user_id(),
        created_at: now,
        updated_at: now,
    };
    store.insert_document(&document).await?;
    info!(document_id = %document.id, user_id = %document.user_id, "document created");
    Ok(document)
}

/// Rename a document.
pub async fn update_document(
    store: &SharedStore,
    identity: &Identity,
    document_id: Uuid,
    title: Option<&str>,
) -> VaultResult<Document> {
    let document = load_for(store, identity, document_id).await?;
    let Some(title) = title else {
        return Ok(document);
    };
    let update = DocumentUpdate {
        title: Some(policy::validate_title(title)?),
        file: None,
    };
    Ok(store.update_document(document_id, update).await?)
}

/// Delete a document. Its blob is deleted first, so a storage failure
/// leaves the row in place for a retry.
pub async fn delete_document(
    store: &SharedStore,
    storage: &dyn ObjectStorage,
    identity: &Identity,
    document_id: Uuid,
) -> VaultResult<()> {
    let document = load_for(store, identity, document_id).await?;
    if let Some(file) = &document.file {
        storage.delete_blob(&file.key).await?;
    }
    if !store.delete_document(document_id).await? {
        return Err(not_found());
    }
    info!(document_id = %document_id, by = %identity.user_id(), "document deleted");
    Ok(())
}

/// Validate the upload and issue a presigned URL for a fresh key.
pub async fn request_upload_url(
    store: &SharedStore,
    storage: &dyn ObjectStorage,
    identity: &Identity,
    document_id: Uuid,
    file_name: &str,
    content_type: &str,
    size: i64,
) -> VaultResult<UploadTicket> {
    let document = load_for(store, identity, document_id).await?;
    let content_type = policy::validate_upload(content_type, size)?;
    let file_key = policy::object_key(document.id, file_name);
    let upload_url = storage.issue_upload_url(&file_key, &content_type).await?;
    Ok(UploadTicket {
        upload_url,
        file_key,
    })
}

/// Record an uploaded blob on the document. A different previous blob is
/// deleted once the row points at the new one.
pub async fn attach_file(
    store: &SharedStore,
    storage: &dyn ObjectStorage,
    identity: &Identity,
    document_id: Uuid,
    attach: &AttachFile,
) -> VaultResult<Document> {
    let document = load_for(store, identity, document_id).await?;
    let content_type = policy::validate_upload(&attach.content_type, attach.size)?;

    let prefix = policy::key_prefix(document.id);
    let suffix = attach.file_key.strip_prefix(&prefix).unwrap_or_default();
    if suffix.is_empty() || suffix.contains('/') {
        return Err(VaultError::Invalid(
            "File key does not belong to this document".into(),
        ));
    }

    let file_name = attach.file_name.trim();
    if file_name.is_empty() {
        return Err(VaultError::Invalid("File name is required".into()));
    }

    let update = DocumentUpdate {
        title: None,
        file: Some(StoredFile {
            key: attach.file_key.clone(),
            name: file_name.to_string(),
            content_type,
            size: attach.size,
        }),
    };
    let updated = store.update_document(document_id, update).await?;

    if let Some(old) = document.file
        && old.key != attach.file_key
        && let Err(e) = storage.delete_blob(&old.key).await
    {
        warn!(document_id = %document_id, key = %old.key, error = %e, "failed to delete replaced blob");
    }
    Ok(updated)
}

/// Presigned download URL for the document's blob.
pub async fn download_url(
    store: &SharedStore,
    storage: &dyn ObjectStorage,
    identity: &Identity,
    document_id: Uuid,
) -> VaultResult<String> {
    let document = load_for(store, identity, document_id).await?;
    let file = document
        .file
        .ok_or_else(|| VaultError::NotFound("Document has no file".into()))?;
    Ok(storage.issue_download_url(&file.key).await?)
}
