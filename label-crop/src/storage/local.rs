/// Filesystem object store.
///
/// Objects live under a root directory and are served back by the `/media`
/// route, so the returned URL is `{public_url}/{key}`.

use super::{validate_key, ObjectStore, StoredObject};
use crate::error::AppError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
    public_url: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a key, or an error if the key is not a plain relative path.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Read a stored object back; `None` if it does not exist.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        let path = self.path_for(key)?;
        debug!(path = %path.display(), size = bytes.len(), content_type, "Writing object");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{public_url}/{key}", public_url = self.public_url),
        })
    }
}
