//! # docvault_core
//!
//! Core domain logic for Docvault: credential store, sessions, API keys,
//! the authorization gate, documents and object storage.

pub mod admin;
pub mod auth;
pub mod config;
pub mod documents;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod uuid;

pub use error::{VaultError, VaultResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
