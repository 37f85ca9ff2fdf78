//! Account request handlers: signup, login, logout and profile.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use docvault_core::auth::Identity;
use docvault_core::auth::accounts::{self, NewAccount, ProfileUpdate};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{LoginRequest, SessionResponse, SignupRequest, UpdateProfileRequest, UserDto};
use crate::services::cookies::{SESSION_COOKIE, clear_session_cookie, session_cookie};

/// `POST /auth/signup`: create an account and start a session.
pub async fn signup_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignupRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let account = NewAccount {
        email: body.email,
        password: body.password,
        name: body.name,
    };
    let (user, opened) = accounts::signup(&state.store, &state.config.security, &account).await?;
    let jar = jar.add(session_cookie(
        &opened.token,
        opened.expires_at,
        state.config.cookie_secure,
    ));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            user: user.into(),
            expires_at: opened.expires_at,
        }),
    ))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let (user, opened) =
        accounts::login(&state.store, &state.config.security, &body.email, &body.password).await?;
    let jar = jar.add(session_cookie(
        &opened.token,
        opened.expires_at,
        state.config.cookie_secure,
    ));
    Ok((
        jar,
        Json(SessionResponse {
            user: user.into(),
            expires_at: opened.expires_at,
        }),
    ))
}

/// `POST /auth/logout`: end the cookie's session, if any.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        accounts::logout(&state.store, &state.config.security, cookie.value()).await?;
    }
    let jar = jar.add(clear_session_cookie(state.config.cookie_secure));
    Ok((jar, StatusCode::NO_CONTENT))
}

/// `GET /auth/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<UserDto>> {
    let user = accounts::profile(&state.store, &identity).await?;
    Ok(Json(user.into()))
}

/// `PATCH /auth/me`
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserDto>> {
    let changes = ProfileUpdate {
        email: body.email,
        name: body.name,
        current_password: body.current_password,
        new_password: body.new_password,
    };
    let user = accounts::update_profile(&state.store, &identity, &changes).await?;
    Ok(Json(user.into()))
}
