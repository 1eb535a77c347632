/// REST client for a remote blob store.
///
/// Objects are written with `PUT {base_url}/{key}`. If the store answers with
/// JSON carrying a `url` field that URL is used, otherwise the object is
/// assumed to be served at `{public_url}/{key}`.

use super::{validate_key, ObjectStore, StoredObject};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct HttpBlobStore {
    base_url: String,
    public_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpBlobStore {
    pub fn new(
        base_url: impl Into<String>,
        public_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build storage HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            public_url: public_url.into(),
            token,
            client,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        validate_key(key)?;

        let url = format!("{base_url}/{key}", base_url = self.base_url);
        debug!(%url, size = bytes.len(), content_type, "Uploading object");

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload of {key} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Upload of {key} failed ({status}): {text}"
            )));
        }

        // Reply body is optional; an empty or non-JSON body means "use the public URL".
        let text = response.text().await.unwrap_or_default();
        let url = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|reply| reply["url"].as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{public_url}/{key}", public_url = self.public_url));

        Ok(StoredObject {
            key: key.to_string(),
            url,
        })
    }
}
