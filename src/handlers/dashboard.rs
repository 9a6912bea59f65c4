//! Host dashboard.

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::dashboard::{EarningsTotals, HostDashboard, StatusCount},
};

/// `GET /api/host/dashboard`
///
/// Earnings count bookings that are confirmed, checked in or completed. Paid-out
/// covers payouts already handed to the bank (`processing` or `paid`).
///
/// ```json
/// {
///   "property_count": 2,
///   "bookings_by_status": [{ "status": "confirmed", "count": 3 }],
///   "earnings": { "gross_cents": 3150000, "commission_cents": 378000, "withholding_cents": 55440, "net_cents": 2716560 },
///   "pending_payout_cents": 905520,
///   "paid_out_cents": 1811040
/// }
/// ```
pub async fn host_dashboard(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<HostDashboard>, AppError> {
    auth.require_host()?;

    let property_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM properties WHERE host_id = $1")
            .bind(auth.user_id)
            .fetch_one(&pool)
            .await?;

    let bookings_by_status = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT b.status, COUNT(*) AS count
        FROM bookings b
        JOIN properties p ON p.id = b.property_id
        WHERE p.host_id = $1
        GROUP BY b.status
        ORDER BY b.status
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    let earnings = sqlx::query_as::<_, EarningsTotals>(
        r#"
        SELECT COALESCE(SUM(b.total_cents), 0)::BIGINT AS gross_cents,
               COALESCE(SUM(b.commission_cents), 0)::BIGINT AS commission_cents,
               COALESCE(SUM(b.withholding_cents), 0)::BIGINT AS withholding_cents,
               COALESCE(SUM(b.host_net_cents), 0)::BIGINT AS net_cents
        FROM bookings b
        JOIN properties p ON p.id = b.property_id
        WHERE p.host_id = $1
          AND b.status IN ('confirmed', 'checked_in', 'completed')
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    let (pending_payout_cents, paid_out_cents): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount_cents) FILTER (WHERE status = 'pending'), 0)::BIGINT,
               COALESCE(SUM(amount_cents) FILTER (WHERE status IN ('processing', 'paid')), 0)::BIGINT
        FROM payouts
        WHERE host_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(HostDashboard {
        property_count,
        bookings_by_status,
        earnings,
        pending_payout_cents,
        paid_out_cents,
    }))
}
