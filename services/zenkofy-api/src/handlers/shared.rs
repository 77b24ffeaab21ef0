//! Shared handler utilities

use std::time::Instant;

use uuid::Uuid;

use zenkofy_types::{Document, DocumentId, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Parse a required id taken from a path, query or body.
pub fn parse_id(raw: Option<&str>, field: &str) -> ApiResult<Uuid> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

/// Treat empty query parameters as absent
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Load one of the caller's documents, 404 when it is not theirs
pub async fn owned_document(
    state: &AppState,
    user_id: UserId,
    document_id: DocumentId,
) -> ApiResult<Document> {
    let row = state
        .repos
        .documents
        .find(user_id.0, document_id.0)
        .await?
        .ok_or(ApiError::NotFound("PDF not found"))?;
    Ok(Document::try_from(row)?)
}

/// Record handler latency with a result label.
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "zenkofy_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(Some(&id.to_string()), "PDF ID").unwrap(), id);

        let missing = parse_id(None, "Note ID").unwrap_err();
        assert_eq!(missing.to_string(), "Note ID is required");

        assert!(matches!(parse_id(Some("  "), "PDF ID"), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            parse_id(Some("not-a-uuid"), "PDF ID"),
            Err(ApiError::BadRequest(m)) if m == "Invalid PDF ID"
        ));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(Some(" ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
