//! Note handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zenkofy_db::CreateNote;
use zenkofy_types::{validate_page, DocumentId, Note, DEFAULT_NOTE_COLOR};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::handlers::documents::SuccessResponse;
use crate::handlers::shared::{non_empty, owned_document, parse_id, record_op_duration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub page: Option<i64>,
    pub text: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNoteQuery {
    #[serde(rename = "Note ID")]
    pub note_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<Note>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub note: Note,
}

/// GET /api/pdf/{id}/notes
pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<NotesResponse>> {
    let pdf_id = parse_id(Some(&id), "PDF ID")?;

    let rows = state.repos.notes.list(user.user_id.0, pdf_id).await?;
    Ok(Json(NotesResponse {
        notes: rows.into_iter().map(Note::from).collect(),
    }))
}

/// POST /api/pdf/{id}/notes
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateNoteRequest>,
) -> ApiResult<Json<NoteResponse>> {
    let start = Instant::now();
    let pdf_id = DocumentId(parse_id(Some(&id), "PDF ID")?);

    let text = non_empty(req.text)
        .ok_or_else(|| ApiError::BadRequest("Note text is required".into()))?;
    let page = req.page.map(validate_page).transpose()?;
    let color = non_empty(req.color).unwrap_or_else(|| DEFAULT_NOTE_COLOR.to_string());

    owned_document(&state, user.user_id, pdf_id).await?;

    let result = state
        .repos
        .notes
        .create(CreateNote {
            id: Uuid::new_v4(),
            pdf_id: pdf_id.0,
            user_id: user.user_id.0,
            page,
            text,
            color,
        })
        .await;
    record_op_duration("create_note", start, result.is_ok());

    Ok(Json(NoteResponse {
        note: Note::from(result?),
    }))
}

/// DELETE /api/pdf/{id}/notes?noteId=
pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteNoteQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let pdf_id = parse_id(Some(&id), "PDF ID")?;
    let note_id = parse_id(query.note_id.as_deref(), "Note ID")?;

    if !state
        .repos
        .notes
        .delete(user.user_id.0, pdf_id, note_id)
        .await?
    {
        return Err(ApiError::NotFound("Note not found"));
    }

    Ok(SuccessResponse::ok())
}
