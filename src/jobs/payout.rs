//! Host payout job.
//!
//! Each run does two things:
//!
//! 1. Creates one `pending` payout per `completed` booking that has none yet
//!    (`payouts.booking_id` is unique, so this is idempotent).
//! 2. Sends a bank transfer for every `pending` payout whose host has a payout
//!    account on file.
//!
//! Runs never overlap: [`PayoutJob::try_acquire`] hands out at most one [`RunGuard`]
//! at a time, and the flag is cleared when the guard drops, even if the run errors.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::payout::{PayoutRunReport, PendingPayout},
    payments::{PayoutTransfer, TransferRequest},
};

/// Result of asking the job to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutRun {
    Completed(PayoutRunReport),
    /// Another run held the guard.
    Skipped,
}

pub struct PayoutJob {
    pool: DbPool,
    transfer: Option<Arc<dyn PayoutTransfer>>,
    running: AtomicBool,
}

/// Proof that the caller owns the current run.
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for PayoutJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayoutJob")
            .field("transfers_enabled", &self.transfer.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}

impl PayoutJob {
    /// `transfer` is `None` when no transfer provider is configured; payouts are
    /// then created but left pending.
    pub fn new(pool: DbPool, transfer: Option<Arc<dyn PayoutTransfer>>) -> Self {
        Self {
            pool,
            transfer,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the run, or `None` if one is already in progress.
    pub fn try_acquire(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                flag: &self.running,
            })
    }

    /// Run once unless a run is already in progress.
    pub async fn run_once(&self) -> Result<PayoutRun, AppError> {
        let Some(_guard) = self.try_acquire() else {
            tracing::warn!("payout run skipped, previous run still in progress");
            return Ok(PayoutRun::Skipped);
        };

        let report = self.run_locked().await?;

        tracing::info!(
            created = report.created,
            transferred = report.transferred,
            failed = report.failed,
            skipped_no_account = report.skipped_no_account,
            "payout run finished"
        );

        Ok(PayoutRun::Completed(report))
    }

    async fn run_locked(&self) -> Result<PayoutRunReport, AppError> {
        let mut report = PayoutRunReport {
            created: self.create_pending_payouts().await?,
            ..PayoutRunReport::default()
        };

        let Some(transfer) = self.transfer.as_ref() else {
            tracing::warn!("no transfer provider configured, payouts left pending");
            return Ok(report);
        };

        let pending = sqlx::query_as::<_, PendingPayout>(
            r#"
            SELECT po.id, po.amount_cents, po.currency,
                   u.payout_account_name, u.payout_account_number, u.payout_bank_code
            FROM payouts po
            JOIN users u ON u.id = po.host_id
            WHERE po.status = 'pending'
            ORDER BY po.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for payout in pending {
            let Some(request) = transfer_request(&payout) else {
                report.skipped_no_account += 1;
                continue;
            };

            if !self.claim(payout.id).await? {
                continue;
            }

            match transfer.transfer(&request).await {
                Ok(reference) => {
                    sqlx::query(
                        r#"
                        UPDATE payouts
                        SET transfer_reference = $1, processed_at = NOW()
                        WHERE id = $2
                        "#,
                    )
                    .bind(&reference)
                    .bind(payout.id)
                    .execute(&self.pool)
                    .await?;

                    tracing::info!(payout_id = %payout.id, reference = %reference, "payout transfer queued");
                    report.transferred += 1;
                }
                Err(err) => {
                    sqlx::query(
                        r#"
                        UPDATE payouts
                        SET status = 'failed', failure_reason = $1, processed_at = NOW()
                        WHERE id = $2
                        "#,
                    )
                    .bind(err.to_string())
                    .bind(payout.id)
                    .execute(&self.pool)
                    .await?;

                    tracing::error!(payout_id = %payout.id, error = %err, "payout transfer failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Insert payouts for completed bookings that have none. Zero amounts are
    /// recorded as already paid.
    async fn create_pending_payouts(&self) -> Result<u64, AppError> {
        let created = sqlx::query(
            r#"
            INSERT INTO payouts (booking_id, host_id, amount_cents, withholding_cents, currency, status, processed_at)
            SELECT b.id, p.host_id, b.host_net_cents, b.withholding_cents, b.currency,
                   CASE WHEN b.host_net_cents > 0 THEN 'pending' ELSE 'paid' END,
                   CASE WHEN b.host_net_cents > 0 THEN NULL ELSE NOW() END
            FROM bookings b
            JOIN properties p ON p.id = b.property_id
            WHERE b.status = 'completed'
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(created)
    }

    /// Move a payout from `pending` to `processing` before calling the provider.
    async fn claim(&self, payout_id: Uuid) -> Result<bool, AppError> {
        let claimed = sqlx::query(
            "UPDATE payouts SET status = 'processing' WHERE id = $1 AND status = 'pending'",
        )
        .bind(payout_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(claimed == 1)
    }

    /// Run every `every`, starting immediately.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once().await {
                    tracing::error!(error = %err, "payout run failed");
                }
            }
        })
    }
}

/// Transfer for `payout`, or `None` if the host has no complete payout account.
fn transfer_request(payout: &PendingPayout) -> Option<TransferRequest> {
    let account_name = payout.payout_account_name.as_deref()?.trim();
    let account_number = payout.payout_account_number.as_deref()?.trim();
    let bank_code = payout.payout_bank_code.as_deref()?.trim();
    if account_name.is_empty() || account_number.is_empty() || bank_code.is_empty() {
        return None;
    }

    Some(TransferRequest {
        reference: format!("payout-{}", payout.id),
        account_name: account_name.to_string(),
        account_number: account_number.to_string(),
        bank_code: bank_code.to_string(),
        amount_cents: payout.amount_cents,
        currency: payout.currency.trim().to_string(),
    })
}
