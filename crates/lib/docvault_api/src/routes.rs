//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_SIGNUP: &str = "/auth/signup";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";

pub const API_KEYS: &str = "/api-keys";
pub const API_KEYS_ID: &str = "/api-keys/{id}";
pub const POST_API_KEYS_ID_REVOKE: &str = "/api-keys/{id}/revoke";

pub const DOCUMENTS: &str = "/documents";
pub const DOCUMENTS_ID: &str = "/documents/{id}";
pub const POST_DOCUMENTS_ID_UPLOAD_URL: &str = "/documents/{id}/upload-url";
pub const PUT_DOCUMENTS_ID_FILE: &str = "/documents/{id}/file";
pub const GET_DOCUMENTS_ID_DOWNLOAD_URL: &str = "/documents/{id}/download-url";

pub const ADMIN_USERS: &str = "/admin/users";
pub const ADMIN_USERS_ID: &str = "/admin/users/{id}";
pub const GET_ADMIN_API_KEYS: &str = "/admin/api-keys";
pub const DELETE_ADMIN_API_KEYS_ID: &str = "/admin/api-keys/{id}";
pub const POST_ADMIN_API_KEYS_ID_REVOKE: &str = "/admin/api-keys/{id}/revoke";
pub const GET_ADMIN_DOCUMENTS: &str = "/admin/documents";
pub const DELETE_ADMIN_DOCUMENTS_ID: &str = "/admin/documents/{id}";
