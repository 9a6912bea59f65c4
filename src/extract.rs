//! Request extractors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json<T>` whose rejection is an [`AppError`], so malformed bodies get the same
/// `{"success": false, ...}` shape as every other error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
