//! Property listing endpoints.
//!
//! - POST /api/properties - Create a listing (host or admin)
//! - GET /api/properties - Public list, optional `?city=`
//! - GET /api/properties/{id} - Public detail
//! - GET /api/host/properties - Caller's own listings

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::property::{CreatePropertyRequest, Property, PropertyQuery},
};

/// Create a property owned by the caller.
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Bole 2BR apartment",
///   "description": "Close to the airport",
///   "city": "Addis Ababa",
///   "price_per_night_cents": 350000,
///   "max_guests": 4
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the property
/// - **403**: caller is not a host or admin
pub async fn create_property(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreatePropertyRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_host()?;
    request.validate()?;

    let property = sqlx::query_as::<_, Property>(
        r#"
        INSERT INTO properties (host_id, title, description, city, price_per_night_cents, max_guests)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    // Owned by the caller
    .bind(auth.user_id)
    .bind(request.title.trim())
    .bind(request.description)
    .bind(request.city.trim())
    .bind(request.price_per_night_cents)
    .bind(request.max_guests)
    .fetch_one(&pool)
    .await?;

    tracing::info!(property_id = %property.id, host_id = %auth.user_id, "property created");

    Ok((StatusCode::CREATED, Json(property)))
}

/// Active properties, newest first. `city` matches case-insensitively.
pub async fn list_properties(
    State(pool): State<DbPool>,
    Query(query): Query<PropertyQuery>,
) -> Result<Json<Vec<Property>>, AppError> {
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let properties = sqlx::query_as::<_, Property>(
        r#"
        SELECT * FROM properties
        WHERE is_active = true
          AND ($1::TEXT IS NULL OR LOWER(city) = LOWER($1))
        ORDER BY created_at DESC
        "#,
    )
    .bind(city)
    .fetch_all(&pool)
    .await?;

    Ok(Json(properties))
}

pub async fn get_property(
    State(pool): State<DbPool>,
    Path(property_id): Path<Uuid>,
) -> Result<Json<Property>, AppError> {
    let property = sqlx::query_as::<_, Property>(
        "SELECT * FROM properties WHERE id = $1 AND is_active = true",
    )
    .bind(property_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Property"))?;

    Ok(Json(property))
}

/// All of the caller's properties, including inactive ones.
pub async fn list_host_properties(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Property>>, AppError> {
    let properties = sqlx::query_as::<_, Property>(
        "SELECT * FROM properties WHERE host_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(properties))
}
