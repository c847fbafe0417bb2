//! Upload, status, document listing, and demo endpoints

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result, ValidationError};
use crate::processing::DemoStatus;
use crate::server::auth::AuthSession;
use crate::server::state::{AppState, StatusLookup};
use crate::types::DocumentSummary;

/// Response from upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: Uuid,
    pub message: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

/// POST /api/documents/upload - Accept one file and start processing it
pub async fn upload(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let max = state.config().server.max_upload_size;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        // Reject by name before reading the body
        state.validate_upload(filename.as_deref(), 0)?;

        let data = field.bytes().await.map_err(|e| multipart_error(e, max))?;
        let view = state
            .submit_upload(&session, filename.as_deref(), &data)
            .await?;

        return Ok(Json(UploadResponse {
            task_id: view.task_id,
            message: "File uploaded successfully, processing started".to_string(),
            filename: view.filename,
            size: data.len() as u64,
        }));
    }

    Err(ValidationError::MissingFile.into())
}

fn multipart_error(e: MultipartError, max: u64) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::BodyTooLarge { max }.into()
    } else {
        ValidationError::BadRequest(e.body_text()).into()
    }
}

/// GET /api/documents/processing-status/:id - Task id or demo key
pub async fn processing_status(
    State(state): State<AppState>,
    AuthSession(_session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<StatusLookup>> {
    state.task_status(&id).map(Json)
}

/// GET /api/documents/list
pub async fn list_documents(
    State(state): State<AppState>,
    AuthSession(_session): AuthSession,
) -> Json<DocumentListResponse> {
    let documents = state.list_documents();
    Json(DocumentListResponse {
        total: documents.len(),
        documents,
    })
}

/// POST /api/documents/:id/set_active
pub async fn set_active(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    state.set_active_document(&session, id)?;
    Ok(Json(serde_json::json!({
        "message": "Active document updated",
        "document_id": id,
    })))
}

/// DELETE /api/documents/:id - Admin only
pub async fn delete_document(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    state.delete_document(&session, id)?;
    Ok(Json(serde_json::json!({
        "message": "Document deleted",
        "document_id": id,
    })))
}

/// POST /api/documents/demo_ingest/:key
pub async fn demo_ingest(
    State(state): State<AppState>,
    AuthSession(_session): AuthSession,
    Path(key): Path<String>,
) -> Result<Json<DemoStatus>> {
    state.start_demo(&key).map(Json)
}
