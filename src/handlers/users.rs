//! User signup and profile endpoints.
//!
//! - POST /api/users - Public signup, returns the API key once
//! - GET /api/users/me - Caller's profile
//! - PUT /api/users/me/payout-account - Set the bank account for payouts

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    db::DbPool,
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::user::{CreatedUserResponse, CreateUserRequest, PayoutAccountRequest, UserResponse},
    services::user_service,
};

/// Register a user.
///
/// # Request Body
///
/// ```json
/// {
///   "full_name": "Almaz Bekele",
///   "email": "almaz@example.com",
///   "phone": "0911000000",
///   "role": "host"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the profile plus `api_key`, which is never shown again
/// - **403**: `role` was `admin`
/// - **409**: email already registered
pub async fn create_user(
    State(pool): State<DbPool>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, api_key) = user_service::create_user(&pool, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            user: user.into(),
            api_key,
        }),
    ))
}

pub async fn get_me(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service::find_user(&pool, auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Set the caller's payout account. The response masks the account number.
pub async fn set_payout_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<PayoutAccountRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_host()?;
    let user = user_service::set_payout_account(&pool, auth.user_id, request).await?;
    Ok(Json(user.into()))
}
