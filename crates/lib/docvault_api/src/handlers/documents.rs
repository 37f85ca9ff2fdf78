//! Document request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use docvault_core::auth::Identity;
use docvault_core::documents::{self, AttachFile};
use docvault_core::uuid::parse_id;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    AttachFileRequest, CreateDocumentRequest, DocumentDto, DocumentListResponse,
    DownloadUrlResponse, UpdateDocumentRequest, UploadUrlRequest, UploadUrlResponse,
};

/// `GET /documents`: the caller's documents.
pub async fn list_documents_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<DocumentListResponse>> {
    let docs = documents::list_documents(&state.store, &identity).await?;
    Ok(Json(DocumentListResponse {
        documents: docs.into_iter().map(DocumentDto::from).collect(),
    }))
}

/// `POST /documents`
pub async fn create_document_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateDocumentRequest>,
) -> AppResult<(StatusCode, Json<DocumentDto>)> {
    let doc = documents::create_document(&state.store, &identity, &body.title).await?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// `GET /documents/{id}`
pub async fn get_document_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<DocumentDto>> {
    let document_id = parse_id(&id, "Document")?;
    let doc = documents::get_document(&state.store, &identity, document_id).await?;
    Ok(Json(doc.into()))
}

/// `PATCH /documents/{id}`
pub async fn update_document_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDocumentRequest>,
) -> AppResult<Json<DocumentDto>> {
    let document_id = parse_id(&id, "Document")?;
    let doc =
        documents::update_document(&state.store, &identity, document_id, body.title.as_deref())
            .await?;
    Ok(Json(doc.into()))
}

/// `DELETE /documents/{id}`: deletes the blob, then the row.
pub async fn delete_document_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let document_id = parse_id(&id, "Document")?;
    documents::delete_document(&state.store, state.storage.as_ref(), &identity, document_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /documents/{id}/upload-url`
pub async fn upload_url_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<UploadUrlRequest>,
) -> AppResult<Json<UploadUrlResponse>> {
    let document_id = parse_id(&id, "Document")?;
    let ticket = documents::request_upload_url(
        &state.store,
        state.storage.as_ref(),
        &identity,
        document_id,
        &body.file_name,
        &body.content_type,
        body.size,
    )
    .await?;
    Ok(Json(UploadUrlResponse {
        upload_url: ticket.upload_url,
        file_key: ticket.file_key,
    }))
}

/// `PUT /documents/{id}/file`: record an uploaded blob.
pub async fn attach_file_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<AttachFileRequest>,
) -> AppResult<Json<DocumentDto>> {
    let document_id = parse_id(&id, "Document")?;
    let attach = AttachFile {
        file_key: body.file_key,
        file_name: body.file_name,
        content_type: body.content_type,
        size: body.size,
    };
    let doc = documents::attach_file(
        &state.store,
        state.storage.as_ref(),
        &identity,
        document_id,
        &attach,
    )
    .await?;
    Ok(Json(doc.into()))
}

/// `GET /documents/{id}/download-url`
pub async fn download_url_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<DownloadUrlResponse>> {
    let document_id = parse_id(&id, "Document")?;
    let download_url =
        documents::download_url(&state.store, state.storage.as_ref(), &identity, document_id)
            .await?;
    Ok(Json(DownloadUrlResponse { download_url }))
}
