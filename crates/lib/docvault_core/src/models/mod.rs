//! Domain models.
//!
//! These are internal domain models, distinct from the HTTP DTOs in
//! `docvault_api::models` (which carry `#[serde(rename_all)]` for camelCase).

pub mod api_key;
pub mod auth;
pub mod document;
