//! Error types and HTTP error response handling.
//!
//! Every handler returns `Result<_, AppError>`. Errors are rendered as
//! `{"success": false, "error": "...", "code": "..."}` with a matching status code.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    payments::PaymentError, services::pricing::BreakdownError, storage::StorageError,
};

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database / storage errors**: details are logged, never shown to the client
/// - **Authentication and authorization**: missing key, wrong role, not the owner
/// - **Validation and state errors**: bad input, conflicting bookings, illegal status changes
/// - **Payment errors**: surfaced under the Alga Pay brand, never the processor's name
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, constraint violation).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object storage write or read failed.
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// API key is missing, invalid, or belongs to an inactive user.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Authenticated, but not allowed to perform this operation.
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist or is not visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request conflicts with existing state (overlapping booking, job already running).
    #[error("{0}")]
    Conflict(String),

    /// Status change not permitted from the current status.
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Request body or parameters are invalid.
    #[error("{0}")]
    InvalidRequest(String),

    /// Upload exceeds the configured size limit (bytes).
    #[error("Payload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Upload content type is not an accepted image type.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Payment provider failure or misconfiguration.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl From<BreakdownError> for AppError {
    fn from(err: BreakdownError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(_) => AppError::InvalidRequest("Invalid object key".to_string()),
            other => AppError::Storage(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status, machine-readable code and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict", self.to_string()),
            AppError::InvalidTransition { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_transition",
                self.to_string(),
            ),
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::PayloadTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                self.to_string(),
            ),
            AppError::UnsupportedMediaType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                self.to_string(),
            ),
            AppError::Payment(err) => match err {
                PaymentError::UnsupportedMethod(_) => (
                    StatusCode::BAD_REQUEST,
                    "unsupported_payment_method",
                    err.to_string(),
                ),
                PaymentError::NotConfigured(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "payment_method_unavailable",
                    err.to_string(),
                ),
                PaymentError::InvalidSignature => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_signature",
                    err.to_string(),
                ),
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "payment_provider_error",
                    "Alga Pay could not process the payment".to_string(),
                ),
            },
            AppError::Database(_) | AppError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::PaymentMethod;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn errors_render_with_success_false() {
        let (status, body) = render(AppError::NotFound("Booking")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Booking not found");
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn provider_failures_hide_the_processor() {
        let err = AppError::Payment(PaymentError::Api {
            status: 500,
            message: "chapa exploded".to_string(),
        });
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Alga Pay could not process the payment");
    }

    #[tokio::test]
    async fn unconfigured_provider_is_service_unavailable() {
        let err = AppError::Payment(PaymentError::NotConfigured(PaymentMethod::Stripe));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "payment_method_unavailable");
    }

    #[tokio::test]
    async fn invalid_transition_is_unprocessable() {
        let err = AppError::InvalidTransition {
            from: "completed".to_string(),
            to: "pending".to_string(),
        };
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Cannot change status from completed to pending");
    }

    #[tokio::test]
    async fn bad_object_keys_are_client_errors() {
        let err: AppError = StorageError::InvalidKey("a/..".to_string()).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");

        let io = std::io::Error::other("disk full");
        let (status, _) = render(StorageError::Io(io).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn database_details_are_hidden() {
        let (status, body) = render(AppError::Database(sqlx::Error::RowNotFound)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }
}
