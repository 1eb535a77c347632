/// HTTP surface: routes and shared state.

pub mod health;
pub mod media;
pub mod originals;
pub mod process;

use crate::pipeline::Pipeline;
use crate::storage::LocalStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub pipeline: Pipeline,
    /// Set when objects are kept on local disk and served by `/media`.
    pub local_store: Option<LocalStore>,
}

/// JSON body shared by the data URI endpoints.
#[derive(Debug, Deserialize)]
pub struct ImageDataRequest {
    #[serde(rename = "imageData")]
    pub image_data: String,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/api/process", post(process::process_image))
        .route("/api/process/upload", post(process::process_upload))
        .route("/api/originals", post(originals::upload_original));

    if state.local_store.is_some() {
        app = app.route("/media/*key", get(media::serve_media));
    }

    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
