//! Authentication middleware.
//!
//! Collects the session cookie and any API key from the request, runs them
//! through the authorization gate and stores the resulting [`Identity`] or
//! [`AdminIdentity`] in request extensions.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use docvault_core::auth::{RequestCredentials, require_admin as gate_admin, require_authenticated};

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// Header carrying an API key as an alternative to `Authorization: Bearer`.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Pull session and API key credentials out of request headers.
pub fn extract_credentials(headers: &HeaderMap) -> RequestCredentials {
    let session_token = CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, key)| key.trim().to_string());
    let api_key = bearer
        .or_else(|| {
            headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .filter(|v| !v.is_empty());

    RequestCredentials {
        session_token,
        api_key,
    }
}

/// Axum middleware: requires any authenticated identity.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credentials = extract_credentials(request.headers());
    let identity =
        require_authenticated(&state.store, &state.config.security, &credentials).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Axum middleware: requires an admin identity.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credentials = extract_credentials(request.headers());
    let admin = gate_admin(&state.store, &state.config.security, &credentials).await?;
    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bEaReR sk_abc"));
        let creds = extract_credentials(&headers);
        assert_eq!(creds.api_key.as_deref(), Some("sk_abc"));
        assert!(creds.session_token.is_none());
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(extract_credentials(&headers).api_key.is_none());
    }

    #[test]
    fn api_key_header_and_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("sk_xyz"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("other=1; docvault_session=tok"),
        );
        let creds = extract_credentials(&headers);
        assert_eq!(creds.api_key.as_deref(), Some("sk_xyz"));
        assert_eq!(creds.session_token.as_deref(), Some("tok"));
    }
}
