//! Consent endpoints. Records are append-only; reads return the latest per type.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    db::DbPool,
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::consent::{Consent, ConsentRequest},
};

/// `POST /api/consent`
///
/// ```json
/// { "consent_type": "marketing", "granted": false, "version": "2025-01" }
/// ```
pub async fn record_consent(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<ConsentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.version.trim().is_empty() {
        return Err(AppError::InvalidRequest("Version is required".to_string()));
    }

    let consent = sqlx::query_as::<_, Consent>(
        r#"
        INSERT INTO consents (user_id, consent_type, granted, version)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(request.consent_type.as_str())
    .bind(request.granted)
    .bind(request.version.trim())
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        consent_type = request.consent_type.as_str(),
        granted = request.granted,
        "consent recorded"
    );

    Ok((StatusCode::CREATED, Json(consent)))
}

/// `GET /api/consent`
pub async fn latest_consents(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Consent>>, AppError> {
    let consents = sqlx::query_as::<_, Consent>(
        r#"
        SELECT DISTINCT ON (consent_type) *
        FROM consents
        WHERE user_id = $1
        ORDER BY consent_type, created_at DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(consents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::lazy_pool,
        models::{consent::ConsentType, user::UserRole},
        testing::auth,
    };

    #[tokio::test]
    async fn blank_version_is_rejected() {
        let request = ConsentRequest {
            consent_type: ConsentType::Cookies,
            granted: true,
            version: "  ".to_string(),
        };

        let result = record_consent(
            State(lazy_pool()),
            Extension(auth(uuid::Uuid::new_v4(), UserRole::Guest)),
            ApiJson(request),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
