//! Authentication and authorization.
//!
//! Provides password hashing, session tokens, API key lifecycle and the
//! authorization gate shared by `docvault_api` and `docvault_cli`.

pub mod accounts;
pub mod api_keys;
pub mod gate;
pub mod password;
pub mod session;

pub use gate::{
    AdminIdentity, AuthMethod, Identity, RequestCredentials, ensure_owner_or_admin,
    require_admin, require_authenticated, resolve_identity,
};
