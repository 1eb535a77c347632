/// GET /media/*key - serve objects written by the local store.

use super::AppState;
use crate::error::AppError;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

pub async fn serve_media(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let Some(store) = &state.local_store else {
        return Ok((StatusCode::NOT_FOUND, "Media not served here").into_response());
    };

    if store.path_for(&key).is_err() {
        return Ok((StatusCode::BAD_REQUEST, "Invalid media key").into_response());
    }

    debug!(%key, "Serving media");
    match store.get(&key).await? {
        Some(bytes) => Ok((
            [
                (header::CONTENT_TYPE, content_type_for(&key)),
                (header::CACHE_CONTROL, "public, max-age=86400"),
            ],
            bytes,
        )
            .into_response()),
        None => Ok((StatusCode::NOT_FOUND, "Media not found").into_response()),
    }
}

/// Content type by extension, for the formats this service stores.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
