//! PDF upload handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use zenkofy_db::CreateDocument;
use zenkofy_types::{Document, UserId};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthUser;
use crate::handlers::shared::{non_empty, record_op_duration};
use crate::state::AppState;

/// Content types accepted as PDF
pub const ALLOWED_CONTENT_TYPES: [&str; 2] = ["application/pdf", "application/x-pdf"];

const FALLBACK_FILE_NAME: &str = "document.pdf";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub pdf: Document,
}

/// File part of the form
struct UploadedFile {
    name: String,
    content_type: String,
    body: Bytes,
}

/// Parsed multipart form
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    title: Option<String>,
    author: Option<String>,
    tags: Option<String>,
}

/// POST /api/upload
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let start = Instant::now();
    let result = upload(&state, user.user_id, multipart).await;

    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::counter!("zenkofy_uploads_total", "status" => outcome).increment(1);
    record_op_duration("upload_document", start, result.is_ok());

    let pdf = result?;
    tracing::info!(user_id = %user.user_id, document_id = %pdf.id, "PDF uploaded");
    Ok(Json(UploadResponse { success: true, pdf }))
}

async fn upload(
    state: &AppState,
    user_id: UserId,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Document> {
    let max_bytes = state.config.max_upload_bytes;
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form = read_form(&mut multipart, max_bytes).await?;

    let (Some(file), Some(title)) = (form.file, non_empty(form.title)) else {
        return Err(ApiError::BadRequest("File and title are required".into()));
    };

    if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(ApiError::BadRequest("Only PDF files are allowed".into()));
    }
    if file.body.len() > max_bytes {
        return Err(size_exceeded(max_bytes));
    }

    let tags = parse_tags(form.tags.as_deref())?;

    let path = object_path(user_id, Utc::now().timestamp_millis(), &file.name);
    state
        .storage
        .upload(&path, file.body, &file.content_type)
        .await?;

    let id = Uuid::new_v4();
    let created = state
        .repos
        .documents
        .create(CreateDocument {
            id,
            user_id: user_id.0,
            title: title.trim().to_string(),
            author: non_empty(form.author).map(|a| a.trim().to_string()),
            file_url: state.storage.public_url(&path),
            file_path: path.clone(),
            cover_url: Some(cover_image_url(id)),
            tags,
        })
        .await;

    let row = match created {
        Ok(row) => row,
        Err(e) => {
            // Compensate: nothing references the object any more
            if let Err(remove_err) = state.storage.remove(&[path.clone()]).await {
                tracing::warn!(
                    error = %remove_err,
                    file_path = %path,
                    "Failed to remove orphaned upload"
                );
            }
            return Err(e.into());
        }
    };

    Ok(Document::try_from(row)?)
}

async fn read_form(multipart: &mut Multipart, max_bytes: usize) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    let map_err = |e: MultipartError| multipart_error(e, max_bytes);

    while let Some(field) = multipart.next_field().await.map_err(map_err)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
                let content_type = field.content_type().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(map_err)?;
                form.file = Some(UploadedFile {
                    name: file_name,
                    content_type,
                    body,
                });
            }
            "title" => form.title = Some(field.text().await.map_err(map_err)?),
            "author" => form.author = Some(field.text().await.map_err(map_err)?),
            "tags" => form.tags = Some(field.text().await.map_err(map_err)?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        size_exceeded(max_bytes)
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn size_exceeded(max_bytes: usize) -> ApiError {
    ApiError::BadRequest(format!(
        "File size exceeds {}MB limit",
        max_bytes / (1024 * 1024)
    ))
}

/// Parse the optional `tags` field, a JSON array of strings
pub fn parse_tags(raw: Option<&str>) -> ApiResult<Vec<String>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|_| ApiError::BadRequest("Tags must be a JSON array of strings".into())),
    }
}

/// Neutralise path separators and collapse whitespace runs to `_`
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;

    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        match c {
            '/' | '\\' => out.push('_'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    // Never produce a relative segment
    match out.trim_start_matches('.') {
        "" => FALLBACK_FILE_NAME.to_string(),
        _ if out.starts_with('.') => format!("_{out}"),
        _ => out,
    }
}

/// Bucket path for a new upload: `{user_id}/{unix_millis}-{file name}`
pub fn object_path(user_id: UserId, unix_millis: i64, file_name: &str) -> String {
    format!("{user_id}/{unix_millis}-{}", sanitize_file_name(file_name))
}

/// Placeholder cover derived from the document id
pub fn cover_image_url(document_id: Uuid) -> String {
    let photo = document_id.as_u128() % 9_000_000_000 + 1_000_000_000;
    format!("https://images.unsplash.com/photo-{photo}?w=500&q=80")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Great  Book.pdf"), "My_Great_Book.pdf");
        assert_eq!(sanitize_file_name("a\tb\nc.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._.._etc_passwd");
        assert_eq!(sanitize_file_name("dir\\evil.pdf"), "dir_evil.pdf");
        assert_eq!(sanitize_file_name(".."), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name(""), FALLBACK_FILE_NAME);
    }

    #[test]
    fn test_object_path() {
        let user = UserId(Uuid::nil());
        assert_eq!(
            object_path(user, 1_700_000_000_000, "Deep Work.pdf"),
            "00000000-0000-0000-0000-000000000000/1700000000000-Deep_Work.pdf"
        );
    }

    #[test]
    fn test_cover_image_url_has_ten_digit_id() {
        for _ in 0..50 {
            let url = cover_image_url(Uuid::new_v4());
            let id = url
                .strip_prefix("https://images.unsplash.com/photo-")
                .and_then(|rest| rest.strip_suffix("?w=500&q=80"))
                .unwrap();
            assert_eq!(id.len(), 10);
            assert!(id.chars().all(|c| c.is_ascii_digit()));
        }
        let id = Uuid::new_v4();
        assert_eq!(cover_image_url(id), cover_image_url(id));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(None).unwrap(), Vec::<String>::new());
        assert_eq!(parse_tags(Some("")).unwrap(), Vec::<String>::new());
        assert_eq!(
            parse_tags(Some(r#"["fiction","classics"]"#)).unwrap(),
            vec!["fiction".to_string(), "classics".to_string()]
        );
        assert!(parse_tags(Some("fiction,classics")).is_err());
        assert!(parse_tags(Some("[1,2]")).is_err());
    }

    #[test]
    fn test_size_message() {
        assert_eq!(
            size_exceeded(crate::config::DEFAULT_MAX_UPLOAD_BYTES).to_string(),
            "File size exceeds 50MB limit"
        );
    }
}
