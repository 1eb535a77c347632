/// POST /api/originals - store the uploaded image as-is

use super::{AppState, ImageDataRequest};
use crate::error::AppError;
use crate::pipeline::UploadResult;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

pub async fn upload_original(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageDataRequest>,
) -> Result<Json<UploadResult>, AppError> {
    let upload = state.pipeline.store_original(&request.image_data).await?;
    Ok(Json(upload))
}
