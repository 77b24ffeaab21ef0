//! Storage errors

use thiserror::Error;

/// Object storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Transport failure reaching the storage API
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Storage API rejected the request
    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Anything else (injected failures, bad configuration)
    #[error("storage error: {0}")]
    Other(String),
}
