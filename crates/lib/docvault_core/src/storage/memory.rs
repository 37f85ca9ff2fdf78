//! In-process object storage for tests and `--in-memory` mode.
//!
//! Issues `memory://` URLs and records every key it was asked about.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ObjectStorage, StorageError};

#[derive(Debug, Default)]
struct Ledger {
    uploads: Vec<String>,
    downloads: Vec<String>,
    deleted: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    ledger: Mutex<Ledger>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys an upload URL was issued for, in order.
    pub fn issued_uploads(&self) -> Vec<String> {
        self.with_ledger(|l| l.uploads.clone())
    }

    /// Keys a download URL was issued for, in order.
    pub fn issued_downloads(&self) -> Vec<String> {
        self.with_ledger(|l| l.downloads.clone())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.with_ledger(|l| l.deleted.iter().cloned().collect())
    }

    pub fn was_deleted(&self, key: &str) -> bool {
        self.with_ledger(|l| l.deleted.contains(key))
    }

    fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> T {
        // A poisoned ledger still holds valid bookkeeping.
        let mut guard = match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == "..") {
        return Err(StorageError::InvalidKey);
    }
    Ok(())
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn issue_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        check_key(key)?;
        self.with_ledger(|l| l.uploads.push(key.to_string()));
        Ok(format!("memory://upload/{key}?content-type={content_type}"))
    }

    async fn issue_download_url(&self, key: &str) -> Result<String, StorageError> {
        check_key(key)?;
        self.with_ledger(|l| l.downloads.push(key.to_string()));
        Ok(format!("memory://download/{key}"))
    }

    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.with_ledger(|l| l.deleted.insert(key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_issued_and_deleted_keys() {
        let storage = MemoryStorage::new();
        let url = storage.issue_upload_url("documents/a/f.pdf", "application/pdf").await.unwrap();
        assert!(url.starts_with("memory://upload/documents/a/f.pdf"));
        storage.issue_download_url("documents/a/f.pdf").await.unwrap();
        storage.delete_blob("documents/a/f.pdf").await.unwrap();
        // Deleting twice is fine.
        storage.delete_blob("documents/a/f.pdf").await.unwrap();

        assert_eq!(storage.issued_uploads(), vec!["documents/a/f.pdf"]);
        assert_eq!(storage.issued_downloads(), vec!["documents/a/f.pdf"]);
        assert_eq!(storage.deleted(), vec!["documents/a/f.pdf"]);
        assert!(storage.was_deleted("documents/a/f.pdf"));
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.delete_blob("../etc/passwd").await,
            Err(StorageError::InvalidKey)
        ));
        assert!(storage.deleted().is_empty());
    }
}
