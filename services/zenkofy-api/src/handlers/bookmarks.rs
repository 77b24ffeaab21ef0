//! Bookmark handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zenkofy_db::{CreateBookmark, DbError};
use zenkofy_types::{default_bookmark_title, validate_page, Bookmark, DocumentId};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::handlers::documents::SuccessResponse;
use crate::handlers::shared::{non_empty, owned_document, parse_id, record_op_duration};
use crate::state::AppState;

const DUPLICATE_BOOKMARK: &str = "Bookmark already exists for this page";

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkRequest {
    pub page: Option<i64>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBookmarkQuery {
    #[serde(rename = "Bookmark ID")]
    pub bookmark_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookmarksResponse {
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub bookmark: Bookmark,
}

/// GET /api/pdf/{id}/bookmarks
pub async fn list_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<BookmarksResponse>> {
    let pdf_id = parse_id(Some(&id), "PDF ID")?;

    let rows = state.repos.bookmarks.list(user.user_id.0, pdf_id).await?;
    Ok(Json(BookmarksResponse {
        bookmarks: rows.into_iter().map(Bookmark::from).collect(),
    }))
}

/// POST /api/pdf/{id}/bookmarks
pub async fn create_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateBookmarkRequest>,
) -> ApiResult<Json<BookmarkResponse>> {
    let start = Instant::now();
    let pdf_id = DocumentId(parse_id(Some(&id), "PDF ID")?);

    let page = req
        .page
        .ok_or_else(|| ApiError::BadRequest("Page number is required".into()))?;
    let page = validate_page(page)?;
    let title = non_empty(req.title).unwrap_or_else(|| default_bookmark_title(page));

    owned_document(&state, user.user_id, pdf_id).await?;

    if state
        .repos
        .bookmarks
        .find_by_page(user.user_id.0, pdf_id.0, page)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(DUPLICATE_BOOKMARK.into()));
    }

    let result = state
        .repos
        .bookmarks
        .create(CreateBookmark {
            id: Uuid::new_v4(),
            pdf_id: pdf_id.0,
            user_id: user.user_id.0,
            page,
            title,
        })
        .await;
    record_op_duration("create_bookmark", start, result.is_ok());

    // A concurrent insert can still win the unique index
    let row = result.map_err(|e| match e {
        DbError::Conflict(_) => ApiError::BadRequest(DUPLICATE_BOOKMARK.into()),
        other => other.into(),
    })?;

    Ok(Json(BookmarkResponse {
        bookmark: Bookmark::from(row),
    }))
}

/// DELETE /api/pdf/{id}/bookmarks?bookmarkId=
pub async fn delete_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteBookmarkQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let pdf_id = parse_id(Some(&id), "PDF ID")?;
    let bookmark_id = parse_id(query.bookmark_id.as_deref(), "Bookmark ID")?;

    if !state
        .repos
        .bookmarks
        .delete(user.user_id.0, pdf_id, bookmark_id)
        .await?
    {
        return Err(ApiError::NotFound("Bookmark not found"));
    }

    Ok(SuccessResponse::ok())
}
