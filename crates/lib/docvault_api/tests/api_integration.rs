//! Integration tests: build the router over in-memory backends and drive
//! it with `oneshot` requests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use docvault_api::config::ApiConfig;
use docvault_api::{AppState, router};
use docvault_core::auth::accounts;
use docvault_core::config::SecurityConfig;
use docvault_core::storage::{MemoryStorage, StorageConfig};
use docvault_core::store::{MemoryStore, SharedStore};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    store: SharedStore,
}

fn test_app() -> TestApp {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        storage: Arc::new(MemoryStorage::new()),
        config: Arc::new(ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            cookie_secure: false,
            security: SecurityConfig::new("test-secret", "test-pepper"),
            storage: StorageConfig::from_env(),
        }),
    };
    TestApp {
        app: router(state),
        store,
    }
}

/// Credential attached to a request.
enum Auth<'a> {
    None,
    Cookie(&'a str),
    Bearer(&'a str),
    ApiKeyHeader(&'a str),
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Auth<'_>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut req = Request::builder().method(method).uri(uri);
    req = match auth {
        Auth::None => req,
        Auth::Cookie(token) => req.header(header::COOKIE, format!("docvault_session={token}")),
        Auth::Bearer(key) => req.header(header::AUTHORIZATION, format!("Bearer {key}")),
        Auth::ApiKeyHeader(key) => req.header("x-api-key", key),
    };
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let session = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("docvault_session="))
        .map(|v| v.split(';').next().unwrap_or_default().to_string());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json, session)
}

async fn signup(app: &Router, email: &str) -> String {
    let (status, body, cookie) = call(
        app,
        "POST",
        "/auth/signup",
        Auth::None,
        Some(json!({ "email": email, "password": "password-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "user");
    cookie.expect("session cookie")
}

async fn admin_session(t: &TestApp) -> String {
    accounts::seed_admin(&t.store, "root@example.com", "admin-password")
        .await
        .unwrap();
    let (status, _, cookie) = call(
        &t.app,
        "POST",
        "/auth/login",
        Auth::None,
        Some(json!({ "email": "root@example.com", "password": "admin-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie.expect("session cookie")
}

#[tokio::test]
async fn health_is_public() {
    let t = test_app();
    let (status, body, _) = call(&t.app, "GET", "/api/health", Auth::None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn protected_routes_require_credentials() {
    let t = test_app();
    let (status, body, _) = call(&t.app, "GET", "/documents", Auth::None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _, _) = call(&t.app, "GET", "/auth/me", Auth::Cookie("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_login_me_logout() {
    let t = test_app();
    let cookie = signup(&t.app, "Alice@Example.com").await;

    let (status, me, _) = call(&t.app, "GET", "/auth/me", Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "alice@example.com");

    let (status, body, _) = call(
        &t.app,
        "POST",
        "/auth/login",
        Auth::None,
        Some(json!({ "email": "alice@example.com", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _, cleared) =
        call(&t.app, "POST", "/auth/logout", Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(cleared.as_deref(), Some(""));

    let (status, _, _) = call(&t.app, "GET", "/auth/me", Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let t = test_app();
    signup(&t.app, "alice@example.com").await;
    let (status, body, _) = call(
        &t.app,
        "POST",
        "/auth/signup",
        Auth::None,
        Some(json!({ "email": "ALICE@example.com", "password": "password-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn api_key_lifecycle_over_http() {
    let t = test_app();
    let cookie = signup(&t.app, "alice@example.com").await;

    let (status, created, _) = call(
        &t.app,
        "POST",
        "/api-keys",
        Auth::Cookie(&cookie),
        Some(json!({ "name": "laptop" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let secret = created["key"].as_str().unwrap().to_string();
    let id = created["apiKey"]["id"].as_str().unwrap().to_string();
    assert!(secret.starts_with("sk_"));
    assert_eq!(created["apiKey"]["state"], "active");

    // The key authenticates through both transports.
    let (status, me, _) = call(&t.app, "GET", "/auth/me", Auth::Bearer(&secret), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "alice@example.com");
    let (status, _, _) =
        call(&t.app, "GET", "/documents", Auth::ApiKeyHeader(&secret), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed, _) = call(&t.app, "GET", "/api-keys", Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!listed.to_string().contains(&secret));
    assert_eq!(listed["apiKeys"][0]["displayPrefix"], format!("{}...", &secret[..11]));

    let (status, fetched, _) = call(
        &t.app,
        "GET",
        &format!("/api-keys/{id}"),
        Auth::Cookie(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "laptop");
    assert!(!fetched.to_string().contains(&secret));

    let uri = format!("/api-keys/{id}/revoke");
    let (status, revoked, _) = call(&t.app, "POST", &uri, Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["state"], "revoked");
    let (status, _, _) = call(&t.app, "POST", &uri, Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(&t.app, "GET", "/auth/me", Auth::Bearer(&secret), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/api-keys/{id}");
    let (status, _, _) = call(&t.app, "DELETE", &uri, Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = call(&t.app, "DELETE", &uri, Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_users_resources_are_access_denied() {
    let t = test_app();
    let alice = signup(&t.app, "alice@example.com").await;
    let bob = signup(&t.app, "bob@example.com").await;

    let (_, created, _) = call(
        &t.app,
        "POST",
        "/api-keys",
        Auth::Cookie(&alice),
        Some(json!({ "name": "ci" })),
    )
    .await;
    let key_id = created["apiKey"]["id"].as_str().unwrap().to_string();

    let (_, doc, _) = call(
        &t.app,
        "POST",
        "/documents",
        Auth::Cookie(&alice),
        Some(json!({ "title": "Taxes" })),
    )
    .await;
    let doc_id = doc["id"].as_str().unwrap().to_string();

    let (status, body, _) = call(
        &t.app,
        "POST",
        &format!("/api-keys/{key_id}/revoke"),
        Auth::Cookie(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");

    let (status, body, _) = call(
        &t.app,
        "GET",
        &format!("/api-keys/{key_id}"),
        Auth::Cookie(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");

    let (status, body, _) = call(
        &t.app,
        "GET",
        &format!("/documents/{doc_id}"),
        Auth::Cookie(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");

    let (status, _, _) = call(
        &t.app,
        "GET",
        "/documents/not-a-uuid",
        Auth::Cookie(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_upload_flow() {
    let t = test_app();
    let cookie = signup(&t.app, "alice@example.com").await;

    let (status, doc, _) = call(
        &t.app,
        "POST",
        "/documents",
        Auth::Cookie(&cookie),
        Some(json!({ "title": "  Contract  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(doc["title"], "Contract");
    assert!(doc["fileKey"].is_null());
    let id = doc["id"].as_str().unwrap().to_string();

    let (status, body, _) = call(
        &t.app,
        "POST",
        &format!("/documents/{id}/upload-url"),
        Auth::Cookie(&cookie),
        Some(json!({ "fileName": "tool.exe", "contentType": "application/x-msdownload", "size": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid");

    let (status, ticket, _) = call(
        &t.app,
        "POST",
        &format!("/documents/{id}/upload-url"),
        Auth::Cookie(&cookie),
        Some(json!({ "fileName": "Signed Copy.pdf", "contentType": "application/pdf", "size": 2048 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let file_key = ticket["fileKey"].as_str().unwrap().to_string();
    assert!(file_key.starts_with(&format!("documents/{id}/")));
    assert!(file_key.ends_with("-signed_copy.pdf"));
    assert!(ticket["uploadUrl"].is_string());

    let (status, attached, _) = call(
        &t.app,
        "PUT",
        &format!("/documents/{id}/file"),
        Auth::Cookie(&cookie),
        Some(json!({
            "fileKey": file_key,
            "fileName": "Signed Copy.pdf",
            "contentType": "application/pdf",
            "size": 2048
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attached["fileName"], "Signed Copy.pdf");
    assert_eq!(attached["size"], 2048);

    let (status, dl, _) = call(
        &t.app,
        "GET",
        &format!("/documents/{id}/download-url"),
        Auth::Cookie(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(dl["downloadUrl"].as_str().unwrap().contains(&file_key));

    let (status, renamed, _) = call(
        &t.app,
        "PATCH",
        &format!("/documents/{id}"),
        Auth::Cookie(&cookie),
        Some(json!({ "title": "Contract v2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Contract v2");

    let (status, _, _) = call(
        &t.app,
        "DELETE",
        &format!("/documents/{id}"),
        Auth::Cookie(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, list, _) = call(&t.app, "GET", "/documents", Auth::Cookie(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["documents"], json!([]));
}

#[tokio::test]
async fn admin_routes_distinguish_anonymous_and_non_admin() {
    let t = test_app();
    let user = signup(&t.app, "alice@example.com").await;

    let (status, body, _) = call(&t.app, "GET", "/admin/users", Auth::None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, body, _) = call(&t.app, "GET", "/admin/users", Auth::Cookie(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn admin_manages_users_keys_and_documents() {
    let t = test_app();
    let root = admin_session(&t).await;
    let alice = signup(&t.app, "alice@example.com").await;

    call(
        &t.app,
        "POST",
        "/api-keys",
        Auth::Cookie(&alice),
        Some(json!({ "name": "ci" })),
    )
    .await;
    call(
        &t.app,
        "POST",
        "/documents",
        Auth::Cookie(&alice),
        Some(json!({ "title": "Taxes" })),
    )
    .await;

    let (status, keys, _) = call(&t.app, "GET", "/admin/api-keys", Auth::Cookie(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys["apiKeys"][0]["ownerEmail"], "alice@example.com");

    let (status, docs, _) =
        call(&t.app, "GET", "/admin/documents", Auth::Cookie(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(docs["documents"][0]["ownerEmail"], "alice@example.com");

    let (status, users, _) = call(&t.app, "GET", "/admin/users", Auth::Cookie(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    let alice_id = users
        .iter()
        .find(|u| u["email"] == "alice@example.com")
        .and_then(|u| u["id"].as_str())
        .unwrap()
        .to_string();
    let root_id = users
        .iter()
        .find(|u| u["email"] == "root@example.com")
        .and_then(|u| u["id"].as_str())
        .unwrap()
        .to_string();

    let (status, body, _) = call(
        &t.app,
        "DELETE",
        &format!("/admin/users/{root_id}"),
        Auth::Cookie(&root),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid");

    let (status, created, _) = call(
        &t.app,
        "POST",
        "/admin/users",
        Auth::Cookie(&root),
        Some(json!({ "email": "ops@example.com", "password": "ops-password", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "admin");

    let (status, _, _) = call(
        &t.app,
        "DELETE",
        &format!("/admin/users/{alice_id}"),
        Auth::Cookie(&root),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, keys, _) = call(&t.app, "GET", "/admin/api-keys", Auth::Cookie(&root), None).await;
    assert_eq!(keys["apiKeys"], json!([]));
    let (_, docs, _) = call(&t.app, "GET", "/admin/documents", Auth::Cookie(&root), None).await;
    assert_eq!(docs["documents"], json!([]));
    let (status, _, _) = call(&t.app, "GET", "/auth/me", Auth::Cookie(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn promoted_user_gains_admin_access_immediately() {
    let t = test_app();
    let root = admin_session(&t).await;
    let alice = signup(&t.app, "alice@example.com").await;
    let (_, me, _) = call(&t.app, "GET", "/auth/me", Auth::Cookie(&alice), None).await;
    let alice_id = me["id"].as_str().unwrap().to_string();

    let (status, updated, _) = call(
        &t.app,
        "PATCH",
        &format!("/admin/users/{alice_id}"),
        Auth::Cookie(&root),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "admin");

    let (status, _, _) = call(&t.app, "GET", "/admin/users", Auth::Cookie(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}
