/// Object storage for originals and crops.

pub mod client;
pub mod local;

pub use client::HttpBlobStore;
pub use local::LocalStore;

use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist `bytes` under `key` and return a publicly fetchable URL.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError>;
}

/// Reject keys that could escape the store's namespace.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if invalid {
        return Err(AppError::Storage(format!("Invalid object key: {key:?}")));
    }
    Ok(())
}
