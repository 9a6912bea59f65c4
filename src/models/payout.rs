//! Host payouts created by the payout job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Row of the `payouts` table.
///
/// Status values: `pending` (awaiting transfer), `processing` (transfer queued),
/// `paid`, `failed`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payout {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub host_id: Uuid,
    pub amount_cents: i64,
    pub withholding_cents: i64,
    pub currency: String,
    pub status: String,
    pub transfer_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Pending payout joined with the host's bank details.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingPayout {
    pub id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub payout_account_name: Option<String>,
    pub payout_account_number: Option<String>,
    pub payout_bank_code: Option<String>,
}

/// Outcome of one payout job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayoutRunReport {
    pub created: u64,
    pub transferred: u64,
    pub failed: u64,
    pub skipped_no_account: u64,
}
