/// Label processing endpoints: /api/process and /api/process/upload

use super::{AppState, ImageDataRequest};
use crate::error::AppError;
use crate::pipeline::ProcessingResult;
use crate::preprocess::data_uri::{sniff_media_type, to_data_uri};
use axum::extract::{Multipart, State};
use axum::Json;
use std::sync::Arc;

/// POST /api/process - JSON body carrying a data URI
pub async fn process_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageDataRequest>,
) -> Result<Json<ProcessingResult>, AppError> {
    let result = state.pipeline.process(&request.image_data).await?;
    Ok(Json(result))
}

/// POST /api/process/upload - multipart form with an `image` file field
pub async fn process_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessingResult>, AppError> {
    let mut image_bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read image: {e}")))?;
            image_bytes = Some(data.to_vec());
            break;
        }
    }

    let image_bytes = image_bytes
        .ok_or_else(|| AppError::BadRequest("No image field in request".to_string()))?;

    let media_type = sniff_media_type(&image_bytes)
        .ok_or_else(|| AppError::BadRequest("Unrecognized image format".to_string()))?;

    let data_uri = to_data_uri(media_type, &image_bytes);
    let result = state.pipeline.process(&data_uri).await?;
    Ok(Json(result))
}
