//! Helpers shared by handlers and middleware.

pub mod cookies;
