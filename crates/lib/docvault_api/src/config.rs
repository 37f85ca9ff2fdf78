//! API server configuration.

use docvault_core::config::SecurityConfig;
use docvault_core::storage::StorageConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable        | Default                                  |
    /// |-----------------|------------------------------------------|
    /// | `BIND_ADDR`     | `127.0.0.1:3100`                         |
    /// | `DATABASE_URL`  | `postgres://localhost:5432/docvault`     |
    /// | `COOKIE_SECURE` | `false`                                  |
    ///
    /// Security and storage settings come from [`SecurityConfig::from_env`]
    /// and [`StorageConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/docvault".into()),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            security: SecurityConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
