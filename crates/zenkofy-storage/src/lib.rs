//! Zenkofy Storage - object storage for uploaded PDFs
//!
//! [`ObjectStore`] is the seam the upload and delete handlers write
//! through. [`SupabaseStorage`] talks to the Supabase Storage REST API;
//! [`MemoryStore`] (feature `memory`) keeps objects in a map.

pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::StorageError;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use supabase::{SupabaseStorage, SupabaseStorageConfig};

/// Bucket-scoped object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any existing object at `path`
    async fn upload(&self, path: &str, body: Bytes, content_type: &str)
        -> Result<(), StorageError>;

    /// Remove objects; missing paths are not an error
    async fn remove(&self, paths: &[String]) -> Result<(), StorageError>;

    /// Public URL an object is served from
    fn public_url(&self, path: &str) -> String;
}
