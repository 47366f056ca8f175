use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::{
    errors::{internal_error, AppError},
    AppState,
};

/// GET /images/{*key}: serves a stored post image or avatar.
pub async fn get_image(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Result<Response, AppError> {
    if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err(AppError::InvalidInput(format!("Invalid image key: {}", key)));
    }
    tracing::debug!(image_key = %key, "Fetching image file via handler");

    let object = state.file_storage.download(&key).await?;
    let content_type = object.content_type.as_deref().unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(object.data))
        .map_err(|e| internal_error!("Failed to build image response: {}", e))
}
