//! Admin request handlers. Every route here sits behind `require_admin`.

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use docvault_core::admin::{self, AdminUserUpdate};
use docvault_core::auth::AdminIdentity;
use docvault_core::auth::accounts::NewAccount;
use docvault_core::uuid::parse_id;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    AdminCreateUserRequest, AdminUpdateUserRequest, ApiKeyDto, ApiKeyListResponse, DocumentDto,
    DocumentListResponse, UserDto, UserListResponse,
};

/// `GET /admin/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
) -> AppResult<Json<UserListResponse>> {
    let users = admin::list_users(&state.store, &admin_id).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserDto::from).collect(),
    }))
}

/// `POST /admin/users`
pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Json(body): Json<AdminCreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserDto>)> {
    let account = NewAccount {
        email: body.email,
        password: body.password,
        name: body.name,
    };
    let user = admin::create_user(&state.store, &admin_id, &account, body.role).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `GET /admin/users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> AppResult<Json<UserDto>> {
    let user_id = parse_id(&id, "User")?;
    let user = admin::get_user(&state.store, &admin_id, user_id).await?;
    Ok(Json(user.into()))
}

/// `PATCH /admin/users/{id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Path(id): Path<String>,
    Json(body): Json<AdminUpdateUserRequest>,
) -> AppResult<Json<UserDto>> {
    let user_id = parse_id(&id, "User")?;
    let changes = AdminUserUpdate {
        email: body.email,
        name: body.name,
        role: body.role,
        password: body.password,
    };
    let user = admin::update_user(&state.store, &admin_id, user_id, &changes).await?;
    Ok(Json(user.into()))
}

/// `DELETE /admin/users/{id}`: cascades to the user's keys and documents.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let user_id = parse_id(&id, "User")?;
    admin::delete_user(&state.store, state.storage.as_ref(), &admin_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/api-keys`
pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
) -> AppResult<Json<ApiKeyListResponse>> {
    let keys = admin::list_api_keys(&state.store, &admin_id).await?;
    Ok(Json(ApiKeyListResponse {
        api_keys: keys.into_iter().map(ApiKeyDto::from).collect(),
    }))
}

/// `POST /admin/api-keys/{id}/revoke`
pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiKeyDto>> {
    let key_id = parse_id(&id, "API key")?;
    let info = admin::revoke_api_key(&state.store, &admin_id, key_id).await?;
    Ok(Json(info.into()))
}

/// `DELETE /admin/api-keys/{id}`
pub async fn delete_api_key_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let key_id = parse_id(&id, "API key")?;
    admin::delete_api_key(&state.store, &admin_id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/documents`
pub async fn list_documents_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
) -> AppResult<Json<DocumentListResponse>> {
    let docs = admin::list_documents(&state.store, &admin_id).await?;
    Ok(Json(DocumentListResponse {
        documents: docs.into_iter().map(DocumentDto::from).collect(),
    }))
}

/// `DELETE /admin/documents/{id}`
pub async fn delete_document_handler(
    State(state): State<AppState>,
    Extension(admin_id): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let document_id = parse_id(&id, "Document")?;
    admin::delete_document(&state.store, state.storage.as_ref(), &admin_id, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
