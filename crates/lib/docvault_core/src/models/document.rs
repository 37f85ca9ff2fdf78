//! Document domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata of the blob attached to a document.
///
/// `key` points into the object storage namespace; the document does not
/// own the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub key: String,
    pub name: String,
    pub content_type: String,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub file: Option<StoredFile>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial document update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub file: Option<StoredFile>,
}

/// Admin listing entry.
#[derive(Debug, Clone)]
pub struct DocumentWithOwner {
    pub document: Document,
    pub owner_email: Option<String>,
}

/// Presigned upload target handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub upload_url: String,
    pub file_key: String,
}
