//! In-memory object store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::{ObjectStore, StorageError};

/// Stored object
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Map-backed [`ObjectStore`]
#[derive(Default, Clone)]
pub struct MemoryStore {
    objects: Arc<DashMap<String, StoredObject>>,
    fail_uploads: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.get(path).map(|o| o.value().clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Other("upload rejected".to_string()));
        }
        self.objects.insert(
            path.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            self.objects.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://pdfs/{path}")
    }
}
