//! Booking endpoints.
//!
//! - POST /api/bookings - Book a property (starts `pending`)
//! - GET /api/bookings - Caller's bookings as a guest
//! - GET /api/bookings/{id} - Visible to guest, host and admins
//! - PATCH /api/bookings/{id}/status - Move along the status progression
//! - GET /api/host/bookings - Bookings on the caller's properties
//! - POST /api/pricing/breakdown - Public fee preview

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::booking::{
        Booking, BookingResponse, BreakdownRequest, CreateBookingRequest,
        UpdateBookingStatusRequest,
    },
    services::{
        booking_service,
        pricing::{BookingBreakdown, calculate_booking_breakdown},
    },
};

/// Create a booking.
///
/// # Request Body
///
/// ```json
/// {
///   "property_id": "550e8400-e29b-41d4-a716-446655440000",
///   "check_in": "2025-03-01",
///   "check_out": "2025-03-04",
///   "guests": 2
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the booking with its fee breakdown
/// - **400**: bad dates or too many guests
/// - **404**: property not found
/// - **409**: dates overlap an active booking
pub async fn create_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = booking_service::create_booking(&pool, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

pub async fn get_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = booking_service::find_visible_booking(&pool, booking_id, &auth).await?;
    Ok(Json(booking.into()))
}

pub async fn list_my_bookings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE guest_id = $1 ORDER BY check_in DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

pub async fn list_host_bookings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    auth.require_host()?;

    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT b.*
        FROM bookings b
        JOIN properties p ON p.id = b.property_id
        WHERE p.host_id = $1
        ORDER BY b.check_in DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// Change a booking's status.
///
/// # Request Body
///
/// ```json
/// { "status": "checked_in" }
/// ```
///
/// # Response
///
/// - **200 OK**: the updated booking
/// - **403**: caller may not set this status
/// - **404**: booking not found or not visible
/// - **422**: transition not allowed from the current status
pub async fn update_booking_status(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = booking_service::update_status(&pool, booking_id, &auth, request.status).await?;
    Ok(Json(booking.into()))
}

/// Fee breakdown for a total, without creating anything.
///
/// ```json
/// { "total_cents": 100000 }
/// ```
pub async fn pricing_breakdown(
    ApiJson(request): ApiJson<BreakdownRequest>,
) -> Result<Json<BookingBreakdown>, AppError> {
    Ok(Json(calculate_booking_breakdown(request.total_cents)?))
}
