//! Document library handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zenkofy_db::{documents_from_rows, DocumentFilter, UpdateDocument};
use zenkofy_types::{Document, DocumentId, Progress, ReadingStatus};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::handlers::shared::{non_empty, owned_document, parse_id, record_op_duration};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListDocumentsQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub id: Option<String>,
    pub status: Option<String>,
    pub progress: Option<i64>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub progress: Option<i64>,
    pub status: Option<String>,
    pub last_read: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub pdfs: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub pdf: Document,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

fn parse_status(raw: Option<String>) -> ApiResult<Option<ReadingStatus>> {
    Ok(non_empty(raw)
        .map(|s| s.parse::<ReadingStatus>())
        .transpose()?)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/pdfs
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListDocumentsQuery>,
) -> ApiResult<Json<DocumentsResponse>> {
    let start = Instant::now();

    let filter = DocumentFilter {
        status: parse_status(query.status)?,
        search: non_empty(query.search),
        tag: non_empty(query.tag),
    };

    let result = state.repos.documents.list(user.user_id.0, &filter).await;
    record_op_duration("list_documents", start, result.is_ok());

    let pdfs = documents_from_rows(result?)?;
    Ok(Json(DocumentsResponse { pdfs }))
}

/// PATCH /api/pdfs
pub async fn update_document(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<UpdateDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let start = Instant::now();
    let id = parse_id(req.id.as_deref(), "PDF ID")?;

    let progress = req.progress.map(Progress::new).transpose()?;
    let update = UpdateDocument {
        status: parse_status(req.status)?,
        progress,
        tags: req.tags,
        last_read: progress.map(|_| Utc::now()),
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let result = state.repos.documents.update(user.user_id.0, id, update).await;
    record_op_duration("update_document", start, result.is_ok());

    let row = result?.ok_or(ApiError::NotFound("PDF not found"))?;
    Ok(Json(DocumentResponse {
        pdf: Document::try_from(row)?,
    }))
}

/// DELETE /api/pdfs?id=
pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DeleteDocumentQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let start = Instant::now();
    let id = DocumentId(parse_id(query.id.as_deref(), "PDF ID")?);

    let document = owned_document(&state, user.user_id, id).await?;

    let deleted = state.repos.documents.delete(user.user_id.0, id.0).await;
    record_op_duration("delete_document", start, deleted.is_ok());
    if !deleted? {
        return Err(ApiError::NotFound("PDF not found"));
    }

    // The row is gone; a stale object is only wasted space
    if let Err(e) = state.storage.remove(&[document.file_path.clone()]).await {
        tracing::warn!(
            error = %e,
            file_path = %document.file_path,
            "Failed to delete stored PDF"
        );
    }

    tracing::info!(user_id = %user.user_id, document_id = %id, "Document deleted");
    Ok(SuccessResponse::ok())
}

/// GET /api/pdf/{id}
pub async fn get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentResponse>> {
    let id = DocumentId(parse_id(Some(&id), "PDF ID")?);
    let pdf = owned_document(&state, user.user_id, id).await?;
    Ok(Json(DocumentResponse { pdf }))
}

/// PATCH /api/pdf/{id}
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateProgressRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    let start = Instant::now();
    let id = parse_id(Some(&id), "PDF ID")?;

    let progress = req.progress.map(Progress::new).transpose()?;
    let status = parse_status(req.status)?;
    let last_read = match req.last_read {
        Some(explicit) => Some(explicit),
        None if progress.is_some() || status.is_some() => Some(Utc::now()),
        None => None,
    };

    let update = UpdateDocument {
        status,
        progress,
        tags: None,
        last_read,
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let result = state.repos.documents.update(user.user_id.0, id, update).await;
    record_op_duration("update_progress", start, result.is_ok());

    let row = result?.ok_or(ApiError::NotFound("PDF not found"))?;
    Ok(Json(DocumentResponse {
        pdf: Document::try_from(row)?,
    }))
}
