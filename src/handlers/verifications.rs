//! ID verification endpoints.
//!
//! - POST /api/verifications - Submit an uploaded document for review
//! - GET /api/verifications/me - Caller's latest submission
//! - PATCH /api/admin/verifications/{id} - Approve or reject (admin)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::verification::{
        IdVerification, ReviewVerificationRequest, SubmitVerificationRequest, key_belongs_to,
    },
    state::AppState,
};

fn already_pending() -> AppError {
    AppError::Conflict("A verification is already pending review".to_string())
}

/// Submit a document.
///
/// # Request Body
///
/// ```json
/// { "document_type": "national_id", "document_key": "<user_id>/<file>.jpg" }
/// ```
///
/// # Response
///
/// - **201 Created**: the pending verification
/// - **400**: key is not one of the caller's uploads
/// - **409**: a submission is already pending
pub async fn submit_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<SubmitVerificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !key_belongs_to(&request.document_key, auth.user_id)
        || !state.storage.exists(&request.document_key).await?
    {
        return Err(AppError::InvalidRequest(
            "Document must be one of your uploads".to_string(),
        ));
    }

    let verification = sqlx::query_as::<_, IdVerification>(
        r#"
        INSERT INTO id_verifications (user_id, document_type, document_key)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (
            SELECT 1 FROM id_verifications WHERE user_id = $1 AND status = 'pending'
        )
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(request.document_type.as_str())
    .bind(&request.document_key)
    .fetch_optional(&state.pool)
    .await
    .map_err(|err| match err {
        // Concurrent submission lost the race on the one-pending index
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => already_pending(),
        other => AppError::Database(other),
    })?
    .ok_or_else(already_pending)?;

    tracing::info!(
        verification_id = %verification.id,
        user_id = %auth.user_id,
        document_type = request.document_type.as_str(),
        "verification submitted"
    );

    Ok((StatusCode::CREATED, Json(verification)))
}

pub async fn my_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<IdVerification>, AppError> {
    let verification = sqlx::query_as::<_, IdVerification>(
        "SELECT * FROM id_verifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(auth.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Verification"))?;

    Ok(Json(verification))
}

/// Approve or reject a pending verification.
///
/// ```json
/// { "status": "approved", "note": "Matches profile" }
/// ```
pub async fn review_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(verification_id): Path<Uuid>,
    ApiJson(request): ApiJson<ReviewVerificationRequest>,
) -> Result<Json<IdVerification>, AppError> {
    auth.require_admin()?;

    let mut tx = state.pool.begin().await?;

    let current: String =
        sqlx::query_scalar("SELECT status FROM id_verifications WHERE id = $1 FOR UPDATE")
            .bind(verification_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Verification"))?;

    if current != "pending" {
        return Err(AppError::InvalidTransition {
            from: current,
            to: request.status.as_str().to_string(),
        });
    }

    let verification = sqlx::query_as::<_, IdVerification>(
        r#"
        UPDATE id_verifications
        SET status = $1, reviewer_note = $2, reviewed_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(request.status.as_str())
    .bind(request.note)
    .bind(verification_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        verification_id = %verification_id,
        status = request.status.as_str(),
        admin = %auth.user_id,
        "verification reviewed"
    );

    Ok(Json(verification))
}
