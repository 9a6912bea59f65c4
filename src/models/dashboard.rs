//! Host dashboard aggregates.

use serde::Serialize;

/// Booking count for one status.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Money totals over bookings that count as earned (confirmed onwards).
#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize)]
pub struct EarningsTotals {
    pub gross_cents: i64,
    pub commission_cents: i64,
    pub withholding_cents: i64,
    pub net_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct HostDashboard {
    pub property_count: i64,
    pub bookings_by_status: Vec<StatusCount>,
    pub earnings: EarningsTotals,
    pub pending_payout_cents: i64,
    pub paid_out_cents: i64,
}
