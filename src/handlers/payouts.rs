//! Host payout endpoints.

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    jobs::payout::PayoutRun,
    middleware::auth::AuthContext,
    models::payout::{Payout, PayoutRunReport},
    state::AppState,
};

/// `GET /api/payouts` - the caller's payouts, newest first.
pub async fn list_my_payouts(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Payout>>, AppError> {
    auth.require_host()?;

    let payouts = sqlx::query_as::<_, Payout>(
        "SELECT * FROM payouts WHERE host_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(payouts))
}

/// `POST /api/admin/payouts/run` - run the payout job now.
///
/// # Response
///
/// - **200 OK**: the run report
/// - **409**: a run is already in progress
pub async fn run_payouts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<PayoutRunReport>, AppError> {
    auth.require_admin()?;

    tracing::info!(admin = %auth.user_id, "manual payout run requested");

    match state.payouts.run_once().await? {
        PayoutRun::Completed(report) => Ok(Json(report)),
        PayoutRun::Skipped => Err(AppError::Conflict(
            "A payout run is already in progress".to_string(),
        )),
    }
}
