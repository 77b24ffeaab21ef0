//! Reading analytics handler

use axum::extract::State;
use axum::Json;

use zenkofy_db::{documents_from_rows, DocumentFilter};
use zenkofy_types::ReadingStats;

use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/analytics
pub async fn get_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ReadingStats>> {
    let rows = state
        .repos
        .documents
        .list(user.user_id.0, &DocumentFilter::default())
        .await?;
    let documents = documents_from_rows(rows)?;

    Ok(Json(ReadingStats::from_documents(&documents)))
}
