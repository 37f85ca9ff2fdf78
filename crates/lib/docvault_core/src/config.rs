//! Security configuration: session signing secret, API key pepper and
//! session lifetime.
//!
//! Loaded once at process start and shared read-only afterwards.

use std::path::PathBuf;

use chrono::Duration;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 365 * 24;

/// Length of generated secrets.
const GENERATED_SECRET_LEN: usize = 64;

/// Secrets and lifetimes used by the session resolver and API key manager.
#[derive(Clone)]
pub struct SecurityConfig {
    /// HS256 signing key for session tokens.
    pub session_secret: String,
    /// HMAC key mixed into every stored API key hash.
    pub api_key_pepper: String,
    /// Lifetime of a newly opened session.
    pub session_ttl: Duration,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("session_secret", &"<redacted>")
            .field("api_key_pepper", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl SecurityConfig {
    /// Build a config from explicit values (tests, embedding).
    pub fn new(session_secret: impl Into<String>, api_key_pepper: impl Into<String>) -> Self {
        Self {
            session_secret: session_secret.into(),
            api_key_pepper: api_key_pepper.into(),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    /// Resolve the config from the environment.
    ///
    /// | Variable                       | Fallback                          |
    /// |--------------------------------|-----------------------------------|
    /// | `SESSION_SECRET` / `AUTH_SECRET` | generated & persisted to file   |
    /// | `API_KEY_PEPPER`               | generated & persisted to file     |
    /// | `SESSION_TTL_HOURS`            | `168`, capped at one year         |
    pub fn from_env() -> Self {
        let session_secret = resolve_secret(&["SESSION_SECRET", "AUTH_SECRET"], "session-secret");
        let api_key_pepper = resolve_secret(&["API_KEY_PEPPER"], "api-key-pepper");
        let ttl_hours = session_ttl_hours(std::env::var("SESSION_TTL_HOURS").ok().as_deref());
        Self {
            session_secret,
            api_key_pepper,
            session_ttl: Duration::hours(ttl_hours),
        }
    }
}

/// Parse a `SESSION_TTL_HOURS` value into `1..=MAX_SESSION_TTL_HOURS`.
fn session_ttl_hours(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_SESSION_TTL_HOURS;
    };
    match raw.trim().parse::<i64>() {
        Ok(hours) if hours > MAX_SESSION_TTL_HOURS => {
            warn!(value = %raw, max = MAX_SESSION_TTL_HOURS, "capping SESSION_TTL_HOURS");
            MAX_SESSION_TTL_HOURS
        }
        Ok(hours) if hours > 0 => hours,
        _ => {
            warn!(value = %raw, "ignoring invalid SESSION_TTL_HOURS");
            DEFAULT_SESSION_TTL_HOURS
        }
    }
}

/// Resolve a secret: first non-empty env var → persisted file → generated.
///
/// A generated secret is persisted so sessions and API key hashes survive a
/// restart.
pub fn resolve_secret(env_vars: &[&str], file_name: &str) -> String {
    for var in env_vars {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    resolve_secret_file(&secret_path(file_name))
}

/// Read a persisted secret from `path`, generating and writing one if absent.
pub fn resolve_secret_file(path: &std::path::Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = std::fs::write(path, &secret) {
        warn!(path = %path.display(), error = %e, "could not persist generated secret");
    } else {
        info!(path = %path.display(), "generated new secret");
    }
    secret
}

/// Path to a persisted secret file under the platform data directory.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docvault")
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let cfg = SecurityConfig::new("very-secret", "pepper-value");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("pepper-value"));
    }

    #[test]
    fn default_ttl_is_one_week() {
        let cfg = SecurityConfig::new("a", "b");
        assert_eq!(cfg.session_ttl, Duration::hours(168));
    }

    #[test]
    fn session_ttl_is_capped_at_one_year() {
        assert_eq!(session_ttl_hours(None), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some(" 24 ")), 24);
        assert_eq!(session_ttl_hours(Some("8760")), MAX_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("2500000000")), MAX_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("99999999999999999999")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("0")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("-5")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("week")), DEFAULT_SESSION_TTL_HOURS);
    }

    #[test]
    fn secret_file_is_generated_once_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secret");
        let first = resolve_secret_file(&path);
        assert_eq!(first.len(), GENERATED_SECRET_LEN);
        let second = resolve_secret_file(&path);
        assert_eq!(first, second);
    }
}
