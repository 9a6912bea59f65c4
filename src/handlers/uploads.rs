//! Image upload endpoint.

use axum::{
    Extension, Json,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};

use crate::{
    error::AppError, middleware::auth::AuthContext, services::upload_service, state::AppState,
};

/// `POST /api/uploads`
///
/// The body is the raw image and `Content-Type` names its type
/// (`image/jpeg`, `image/png` or `image/webp`).
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "success": true,
///   "key": "550e8400-.../0c5c....png",
///   "url": "http://localhost:3000/uploads/550e8400-.../0c5c....png"
/// }
/// ```
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let max_bytes = state.config.upload_max_bytes;
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    // Reads at most `max_bytes`; the route disables axum's default body limit.
    let body = to_bytes(body, max_bytes)
        .await
        .map_err(|_| AppError::PayloadTooLarge(max_bytes))?;

    let upload = upload_service::store_image(
        state.storage.as_ref(),
        auth.user_id,
        content_type,
        &body,
        max_bytes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(upload)))
}
