//! Upload policy: allowed content types, size limit, titles and object keys.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::uuid::uuidv7;

/// Largest accepted upload: 50 MiB.
pub const MAX_FILE_SIZE: i64 = 50 * 1024 * 1024;

pub const MAX_TITLE_LEN: usize = 255;

/// Longest sanitised file name kept in an object key.
const MAX_KEY_NAME_LEN: usize = 200;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "text/plain",
];

/// Media type without parameters, lowercased.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check content type and size before any URL is issued.
pub fn validate_upload(content_type: &str, size: i64) -> VaultResult<String> {
    let essence = essence(content_type);
    if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
        return Err(VaultError::Invalid(format!(
            "File type '{essence}' is not allowed"
        )));
    }
    if size <= 0 {
        return Err(VaultError::Invalid("File is empty".into()));
    }
    if size > MAX_FILE_SIZE {
        return Err(VaultError::Invalid("File exceeds the 50 MB limit".into()));
    }
    Ok(essence)
}

pub fn validate_title(raw: &str) -> VaultResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(VaultError::Invalid("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(VaultError::Invalid(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

/// Make a file name safe for an object key.
///
/// Accents are stripped (NFD, then combining marks dropped). Characters
/// outside `[A-Za-z0-9._-]` become `_`, runs of `_` collapse, and the
/// result is lowercased.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c.to_ascii_lowercase()
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let out: String = out.chars().take(MAX_KEY_NAME_LEN).collect();
    // Keep keys free of "." / ".." segments.
    if out.chars().all(|c| c == '.' || c == '_') {
        return "file".into();
    }
    out
}

/// Key prefix every blob of `document_id` lives under.
pub fn key_prefix(document_id: Uuid) -> String {
    format!("documents/{document_id}/")
}

/// Fresh object key for an upload to `document_id`.
pub fn object_key(document_id: Uuid, file_name: &str) -> String {
    format!(
        "{}{}-{}",
        key_prefix(document_id),
        uuidv7(),
        sanitize_file_name(file_name)
    )
}
