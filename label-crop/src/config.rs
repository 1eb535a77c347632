/// Environment-based configuration.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files under `storage_dir`, served back by this process at `/media`.
    Local,
    /// Remote blob store reached with `PUT {storage_url}/{key}`.
    Http,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub model_api_url: String,
    pub model_api_key: Option<String>,
    pub model_name: String,
    pub model_timeout: Duration,
    pub storage_backend: StorageBackend,
    pub storage_dir: PathBuf,
    pub storage_url: Option<String>,
    pub storage_token: Option<String>,
    pub storage_public_url: String,
    pub storage_timeout: Duration,
    pub crop_prefix: String,
    pub original_prefix: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let storage_backend = match lookup("STORAGE_BACKEND").as_deref() {
            Some("http") => StorageBackend::Http,
            _ => StorageBackend::Local,
        };

        Self {
            port,
            model_api_url: lookup("MODEL_API_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            model_api_key: lookup("MODEL_API_KEY").filter(|k| !k.is_empty()),
            model_name: lookup("MODEL_NAME").unwrap_or_else(|| "gpt-4o".to_string()),
            model_timeout: Duration::from_secs(
                lookup("MODEL_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            storage_backend,
            storage_dir: lookup("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./media")),
            storage_url: lookup("STORAGE_URL").map(|u| u.trim_end_matches('/').to_string()),
            storage_token: lookup("STORAGE_TOKEN").filter(|t| !t.is_empty()),
            storage_public_url: lookup("STORAGE_PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{port}/media")),
            storage_timeout: Duration::from_secs(
                lookup("STORAGE_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            crop_prefix: lookup("CROP_PREFIX").unwrap_or_else(|| "wine-crops".to_string()),
            original_prefix: lookup("ORIGINAL_PREFIX")
                .unwrap_or_else(|| "wine-originals".to_string()),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(25 * 1024 * 1024),
        }
    }
}
