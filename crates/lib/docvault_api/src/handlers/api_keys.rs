//! API key request handlers for the caller's own keys.

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use docvault_core::auth::{Identity, api_keys};
use docvault_core::uuid::parse_id;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{ApiKeyDto, ApiKeyListResponse, CreateApiKeyRequest, CreateApiKeyResponse};

/// `POST /api-keys`: issue a key. The secret is in this response only.
pub async fn create_api_key_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateApiKeyRequest>,
) -> AppResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    let issued = api_keys::create_api_key(
        &state.store,
        &state.config.security,
        &identity,
        &body.name,
        body.expires_at,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            key: issued.secret,
            api_key: issued.info.into(),
        }),
    ))
}

/// `GET /api-keys`
pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ApiKeyListResponse>> {
    let keys = api_keys::list_api_keys(&state.store, &identity).await?;
    Ok(Json(ApiKeyListResponse {
        api_keys: keys.into_iter().map(ApiKeyDto::from).collect(),
    }))
}

/// `GET /api-keys/{id}`
pub async fn get_api_key_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiKeyDto>> {
    let key_id = parse_id(&id, "API key")?;
    let info = api_keys::get_api_key(&state.store, &identity, key_id).await?;
    Ok(Json(info.into()))
}

/// `POST /api-keys/{id}/revoke`
pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiKeyDto>> {
    let key_id = parse_id(&id, "API key")?;
    let info = api_keys::revoke_api_key(&state.store, &identity, key_id).await?;
    Ok(Json(info.into()))
}

/// `DELETE /api-keys/{id}`
pub async fn delete_api_key_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let key_id = parse_id(&id, "API key")?;
    api_keys::delete_api_key(&state.store, &identity, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
