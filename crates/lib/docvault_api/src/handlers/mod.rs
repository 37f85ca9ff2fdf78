//! Request handlers.

pub mod admin;
pub mod api_keys;
pub mod auth;
pub mod documents;
pub mod health;
