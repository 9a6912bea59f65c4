//! Feature flag endpoints.

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    db::DbPool,
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::feature_flag::{FeatureFlag, UpdateFeatureFlagRequest, is_valid_flag_name},
};

/// `GET /api/feature-flags` - `{ "instant_booking": true, ... }`
pub async fn list_feature_flags(
    State(pool): State<DbPool>,
) -> Result<Json<BTreeMap<String, bool>>, AppError> {
    let flags = sqlx::query_as::<_, FeatureFlag>("SELECT * FROM feature_flags")
        .fetch_all(&pool)
        .await?;

    Ok(Json(
        flags.into_iter().map(|flag| (flag.name, flag.enabled)).collect(),
    ))
}

/// `PUT /api/admin/feature-flags/{name}` - create or update a flag.
pub async fn upsert_feature_flag(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
    ApiJson(request): ApiJson<UpdateFeatureFlagRequest>,
) -> Result<Json<FeatureFlag>, AppError> {
    auth.require_admin()?;

    if !is_valid_flag_name(&name) {
        return Err(AppError::InvalidRequest(format!(
            "Invalid feature flag name '{name}'"
        )));
    }

    let flag = sqlx::query_as::<_, FeatureFlag>(
        r#"
        INSERT INTO feature_flags (name, enabled, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE
        SET enabled = EXCLUDED.enabled,
            description = COALESCE(EXCLUDED.description, feature_flags.description),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(request.enabled)
    .bind(request.description)
    .fetch_one(&pool)
    .await?;

    tracing::info!(flag = %name, enabled = flag.enabled, admin = %auth.user_id, "feature flag updated");

    Ok(Json(flag))
}
