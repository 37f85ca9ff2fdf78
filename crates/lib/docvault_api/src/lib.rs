//! # docvault_api
//!
//! HTTP API library for Docvault.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use docvault_core::storage::SharedStorage;
use docvault_core::store::SharedStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{admin, api_keys, auth, documents, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential store backend.
    pub store: SharedStore,
    /// Object storage backend.
    pub storage: SharedStorage,
    /// API configuration.
    pub config: Arc<ApiConfig>,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_SIGNUP, post(auth::signup_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    // Any authenticated caller; ownership is checked per resource
    let authenticated = Router::new()
        .route(
            routes::AUTH_ME,
            get(auth::me_handler).patch(auth::update_me_handler),
        )
        .route(
            routes::API_KEYS,
            get(api_keys::list_api_keys_handler).post(api_keys::create_api_key_handler),
        )
        .route(
            routes::API_KEYS_ID,
            get(api_keys::get_api_key_handler).delete(api_keys::delete_api_key_handler),
        )
        .route(
            routes::POST_API_KEYS_ID_REVOKE,
            post(api_keys::revoke_api_key_handler),
        )
        .route(
            routes::DOCUMENTS,
            get(documents::list_documents_handler).post(documents::create_document_handler),
        )
        .route(
            routes::DOCUMENTS_ID,
            get(documents::get_document_handler)
                .patch(documents::update_document_handler)
                .delete(documents::delete_document_handler),
        )
        .route(
            routes::POST_DOCUMENTS_ID_UPLOAD_URL,
            post(documents::upload_url_handler),
        )
        .route(
            routes::PUT_DOCUMENTS_ID_FILE,
            put(documents::attach_file_handler),
        )
        .route(
            routes::GET_DOCUMENTS_ID_DOWNLOAD_URL,
            get(documents::download_url_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Admin only
    let admin_only = Router::new()
        .route(
            routes::ADMIN_USERS,
            get(admin::list_users_handler).post(admin::create_user_handler),
        )
        .route(
            routes::ADMIN_USERS_ID,
            get(admin::get_user_handler)
                .patch(admin::update_user_handler)
                .delete(admin::delete_user_handler),
        )
        .route(routes::GET_ADMIN_API_KEYS, get(admin::list_api_keys_handler))
        .route(
            routes::POST_ADMIN_API_KEYS_ID_REVOKE,
            post(admin::revoke_api_key_handler),
        )
        .route(
            routes::DELETE_ADMIN_API_KEYS_ID,
            delete(admin::delete_api_key_handler),
        )
        .route(
            routes::GET_ADMIN_DOCUMENTS,
            get(admin::list_documents_handler),
        )
        .route(
            routes::DELETE_ADMIN_DOCUMENTS_ID,
            delete(admin::delete_document_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin_only)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
