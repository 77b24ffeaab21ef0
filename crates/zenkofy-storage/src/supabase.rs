//! Supabase Storage REST client

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::{ObjectStore, StorageError};

/// Bytes left as-is inside one path segment (RFC 3986 unreserved)
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode an object key segment by segment, keeping `/`
pub fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Connection settings for a Supabase Storage bucket
#[derive(Clone)]
pub struct SupabaseStorageConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Service role key used for server-side writes
    pub service_role_key: String,
    /// Bucket holding the uploaded PDFs
    pub bucket: String,
}

impl std::fmt::Debug for SupabaseStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorageConfig")
            .field("url", &self.url)
            .field("service_role_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Supabase Storage client
#[derive(Clone, Debug)]
pub struct SupabaseStorage {
    client: Client,
    config: SupabaseStorageConfig,
}

impl SupabaseStorage {
    /// Create a new storage client
    pub fn new(config: SupabaseStorageConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a storage client sharing an existing HTTP client
    pub fn with_client(mut config: SupabaseStorageConfig, client: Client) -> Self {
        config.url = config.url.trim_end_matches('/').to_string();
        Self { client, config }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url,
            self.config.bucket,
            encode_object_path(path)
        )
    }

    async fn check(response: reqwest::Response) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or(body);
        error!(status = %status, message = %message, "Storage API error");
        Err(StorageError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        debug!("Uploading object");
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.config.service_role_key)
            .header("apikey", &self.config.service_role_key)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "true")
            .body(body)
            .send()
            .await?;

        Self::check(response).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}/storage/v1/object/{}",
            self.config.url, self.config.bucket
        );
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.config.service_role_key)
            .header("apikey", &self.config.service_role_key)
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;

        Self::check(response).await
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url,
            self.config.bucket,
            encode_object_path(path)
        )
    }
}
