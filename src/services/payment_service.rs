//! Alga Pay checkout and payment finalization.
//!
//! # Finalization
//!
//! A payment is finalized when a provider reports it paid, through either the verify
//! endpoint or a webhook. Both paths end in [`finalize_paid`], which flips the payment
//! to `completed` and the booking to `confirmed` inside one database transaction.
//! Running it twice for the same `tx_ref` is a no-op.

use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        booking::{Booking, BookingStatus},
        payment::{
            AlgaPayRequest, AlgaPayResponse, Payment, PaymentStatus, PaymentVerificationResponse,
            ReviewReason,
        },
        user::User,
    },
    payments::{
        CheckoutRequest, PaymentMethod, ProviderPaymentStatus,
        alga_pay::{AlgaPay, BRAND},
    },
    services::user_service,
};

/// What [`finalize_paid`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Payment completed and booking confirmed.
    Confirmed,
    /// Payment completed and flagged `booking_not_pending`: the booking had already
    /// left `pending` (e.g. cancelled).
    BookingNotPending,
    /// Already completed earlier.
    AlreadyCompleted,
    /// Provider amount differs from the booking total; payment marked failed and
    /// flagged `amount_mismatch`.
    AmountMismatch,
    /// Payment was already marked failed; left untouched.
    PreviouslyFailed,
    /// No payment with this reference.
    UnknownPayment,
}

pub fn new_tx_ref() -> String {
    format!("alga-{}", Uuid::new_v4())
}

/// Split "Almaz Bekele Tadesse" into ("Almaz", "Bekele Tadesse").
fn split_name(full_name: &str) -> (Option<String>, Option<String>) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().map(str::to_string);
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, (!rest.is_empty()).then_some(rest))
}

/// Provider-neutral checkout for `booking`. The amount comes from the booking.
pub fn build_checkout_request(
    config: &Config,
    booking: &Booking,
    payer: &User,
    method: PaymentMethod,
    tx_ref: String,
    request: &AlgaPayRequest,
) -> CheckoutRequest {
    let app = config.public_app_url.trim_end_matches('/');
    let api = config.public_api_url.trim_end_matches('/');
    let (first_name, last_name) = split_name(&payer.full_name);

    CheckoutRequest {
        return_url: format!("{app}/bookings/{}/payment?tx_ref={tx_ref}", booking.id),
        cancel_url: format!("{app}/bookings/{}", booking.id),
        callback_url: format!("{api}/api/payments/webhooks/{method}"),
        tx_ref,
        amount_cents: booking.total_cents,
        currency: booking.currency.trim().to_string(),
        description: format!("Booking {} ({} nights)", booking.id, booking.nights),
        email: request.email.clone().or_else(|| Some(payer.email.clone())),
        first_name: request.first_name.clone().or(first_name),
        last_name: request.last_name.clone().or(last_name),
        phone: request.phone.clone().or_else(|| payer.phone.clone()),
    }
}

/// Start an Alga Pay checkout for one of the caller's pending bookings.
///
/// # Errors
///
/// - `Payment(UnsupportedMethod)`: unknown method (400)
/// - `Payment(NotConfigured)`: method has no credentials (503)
/// - `NotFound`: booking missing or not the caller's
/// - `Conflict`: booking is not awaiting payment
/// - `Payment(..)`: provider failure (502)
pub async fn start_checkout(
    pool: &DbPool,
    alga: &AlgaPay,
    config: &Config,
    actor: &AuthContext,
    request: AlgaPayRequest,
) -> Result<AlgaPayResponse, AppError> {
    let method: PaymentMethod = request.method.parse()?;
    // Fail fast before touching the database.
    alga.provider(method)?;

    let booking = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE id = $1 AND guest_id = $2",
    )
    .bind(request.booking_id)
    .bind(actor.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Booking"))?;

    if booking.status()? != BookingStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Booking is {} and cannot be paid",
            booking.status
        )));
    }
    if booking.total_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Booking has nothing to pay".to_string(),
        ));
    }

    let payer = user_service::find_user(pool, actor.user_id).await?;
    let tx_ref = new_tx_ref();
    let checkout_request =
        build_checkout_request(config, &booking, &payer, method, tx_ref.clone(), &request);

    let checkout = alga.initialize(method, &checkout_request).await?;

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (
            booking_id, method, tx_ref, provider_reference,
            amount_cents, currency, status, checkout_url
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
        RETURNING *
        "#,
    )
    .bind(booking.id)
    .bind(method.as_str())
    .bind(&tx_ref)
    .bind(&checkout.reference)
    .bind(booking.total_cents)
    .bind(&checkout_request.currency)
    .bind(&checkout.checkout_url)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        payment_id = %payment.id,
        booking_id = %booking.id,
        %method,
        tx_ref = %tx_ref,
        amount_cents = booking.total_cents,
        "alga pay checkout started"
    );

    Ok(AlgaPayResponse {
        success: true,
        provider: BRAND,
        method,
        payment_id: payment.id,
        tx_ref,
        checkout_url: checkout.checkout_url,
        amount_cents: payment.amount_cents,
        currency: payment.currency,
    })
}

/// Payment by our `tx_ref` or by the provider's reference.
pub async fn find_payment_by_reference(
    pool: &DbPool,
    reference: &str,
) -> Result<Option<Payment>, AppError> {
    Ok(sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE tx_ref = $1 OR provider_reference = $1 LIMIT 1",
    )
    .bind(reference)
    .fetch_optional(pool)
    .await?)
}

/// Ask the provider about `tx_ref` and apply the answer.
///
/// Visible to the paying guest and admins.
pub async fn verify_payment(
    pool: &DbPool,
    alga: &AlgaPay,
    actor: &AuthContext,
    tx_ref: &str,
) -> Result<PaymentVerificationResponse, AppError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT p.*
        FROM payments p
        JOIN bookings b ON b.id = p.booking_id
        WHERE p.tx_ref = $1 AND ($3 OR b.guest_id = $2)
        "#,
    )
    .bind(tx_ref)
    .bind(actor.user_id)
    .bind(actor.role.is_admin())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Payment"))?;

    let provider_status = sync_with_provider(pool, alga, &payment).await?;

    let refreshed = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(payment.id)
        .fetch_one(pool)
        .await?;

    Ok(PaymentVerificationResponse::new(&refreshed, provider_status))
}

/// Verify `payment` with its provider and finalize or fail it accordingly.
pub async fn sync_with_provider(
    pool: &DbPool,
    alga: &AlgaPay,
    payment: &Payment,
) -> Result<ProviderPaymentStatus, AppError> {
    let method = payment.method()?;
    let verification = alga
        .verify(method, payment.verification_reference())
        .await?;

    match verification.status {
        ProviderPaymentStatus::Paid => {
            finalize_paid(pool, &payment.tx_ref, verification.amount_cents).await?;
        }
        ProviderPaymentStatus::Failed => {
            mark_failed(pool, &payment.tx_ref).await?;
        }
        ProviderPaymentStatus::Pending => {}
    }

    Ok(verification.status)
}

/// Whether a provider-reported amount is acceptable for `expected`.
///
/// Providers that do not report an amount are trusted on status alone.
pub fn amount_matches(expected_cents: i64, reported_cents: Option<i64>) -> bool {
    reported_cents.is_none_or(|reported| reported == expected_cents)
}

/// Complete the payment `tx_ref` and confirm its booking, atomically.
///
/// # Process
///
/// 1. Lock the payment row
/// 2. Return early if it is already completed or failed
/// 3. Check the provider amount against the stored amount
/// 4. Confirm the booking (only from `pending`) and mark the payment `completed`,
///    flagged for review if the booking could not be confirmed
/// 5. Commit
pub async fn finalize_paid(
    pool: &DbPool,
    tx_ref: &str,
    reported_amount_cents: Option<i64>,
) -> Result<FinalizeOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let Some(payment) =
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE tx_ref = $1 FOR UPDATE")
            .bind(tx_ref)
            .fetch_optional(&mut *tx)
            .await?
    else {
        tracing::warn!(tx_ref, "paid notification for unknown payment");
        return Ok(FinalizeOutcome::UnknownPayment);
    };

    match payment.status()? {
        PaymentStatus::Completed => return Ok(FinalizeOutcome::AlreadyCompleted),
        PaymentStatus::Failed => {
            tracing::warn!(tx_ref, payment_id = %payment.id, "paid notification for failed payment");
            return Ok(FinalizeOutcome::PreviouslyFailed);
        }
        PaymentStatus::Pending => {}
    }

    if !amount_matches(payment.amount_cents, reported_amount_cents) {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'failed', review_reason = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(ReviewReason::AmountMismatch.as_str())
        .bind(payment.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::error!(
            tx_ref,
            payment_id = %payment.id,
            expected_cents = payment.amount_cents,
            reported_cents = ?reported_amount_cents,
            "provider amount does not match booking total"
        );
        return Ok(FinalizeOutcome::AmountMismatch);
    }

    let confirmed = sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'confirmed', updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(payment.booking_id)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    // The money was taken either way; a late payment is kept but flagged.
    let review_reason = (!confirmed).then_some(ReviewReason::BookingNotPending.as_str());
    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'completed', review_reason = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(review_reason)
    .bind(payment.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if !confirmed {
        tracing::warn!(
            tx_ref,
            payment_id = %payment.id,
            booking_id = %payment.booking_id,
            "payment completed for a booking that is no longer pending, flagged for review"
        );
        return Ok(FinalizeOutcome::BookingNotPending);
    }

    tracing::info!(
        tx_ref,
        payment_id = %payment.id,
        booking_id = %payment.booking_id,
        "payment completed, booking confirmed"
    );

    Ok(FinalizeOutcome::Confirmed)
}

/// Mark a pending payment failed. Completed payments are never downgraded.
pub async fn mark_failed(pool: &DbPool, tx_ref: &str) -> Result<bool, AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'failed', updated_at = NOW()
        WHERE tx_ref = $1 AND status = 'pending'
        "#,
    )
    .bind(tx_ref)
    .execute(pool)
    .await?
    .rows_affected();

    if updated > 0 {
        tracing::info!(tx_ref, "payment marked failed");
    }

    Ok(updated > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config() -> Config {
        envy::from_iter([
            ("DATABASE_URL".to_string(), "postgres://localhost/alga".to_string()),
            ("PUBLIC_APP_URL".to_string(), "https://alga.et/".to_string()),
            ("PUBLIC_API_URL".to_string(), "https://api.alga.et".to_string()),
        ])
        .unwrap()
    }

    fn booking() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            guest_id: Uuid::new_v4(),
            check_in: "2025-03-01".parse().unwrap(),
            check_out: "2025-03-04".parse().unwrap(),
            guests: 2,
            nights: 3,
            total_cents: 1_050_000,
            commission_cents: 126_000,
            vat_cents: 18_900,
            host_gross_cents: 924_000,
            withholding_cents: 18_480,
            host_net_cents: 905_520,
            currency: "ETB".to_string(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payer() -> User {
        User {
            id: Uuid::new_v4(),
            full_name: "Almaz Bekele Tadesse".to_string(),
            email: "almaz@example.com".to_string(),
            phone: Some("0911000000".to_string()),
            role: "guest".to_string(),
            api_key_hash: "hash".to_string(),
            is_active: true,
            payout_account_name: None,
            payout_account_number: None,
            payout_bank_code: None,
            created_at: Utc::now(),
        }
    }

    fn request(email: Option<&str>) -> AlgaPayRequest {
        AlgaPayRequest {
            booking_id: Uuid::new_v4(),
            method: "chapa".to_string(),
            email: email.map(str::to_string),
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    #[test]
    fn tx_refs_are_unique_and_branded() {
        let a = new_tx_ref();
        assert!(a.starts_with("alga-"));
        assert_ne!(a, new_tx_ref());
    }

    #[test]
    fn checkout_amount_comes_from_booking() {
        let booking = booking();
        let checkout = build_checkout_request(
            &config(),
            &booking,
            &payer(),
            PaymentMethod::Chapa,
            "alga-1".to_string(),
            &request(None),
        );

        assert_eq!(checkout.amount_cents, 1_050_000);
        assert_eq!(checkout.currency, "ETB");
        assert_eq!(
            checkout.return_url,
            format!("https://alga.et/bookings/{}/payment?tx_ref=alga-1", booking.id)
        );
        assert_eq!(
            checkout.callback_url,
            "https://api.alga.et/api/payments/webhooks/chapa"
        );
    }

    #[test]
    fn payer_details_fill_gaps_in_request() {
        let checkout = build_checkout_request(
            &config(),
            &booking(),
            &payer(),
            PaymentMethod::Stripe,
            "alga-2".to_string(),
            &request(Some("billing@example.com")),
        );

        assert_eq!(checkout.email.as_deref(), Some("billing@example.com"));
        assert_eq!(checkout.first_name.as_deref(), Some("Almaz"));
        assert_eq!(checkout.last_name.as_deref(), Some("Bekele Tadesse"));
        assert_eq!(checkout.phone.as_deref(), Some("0911000000"));
    }

    #[test]
    fn single_word_names_have_no_last_name() {
        assert_eq!(split_name("Abebe"), (Some("Abebe".to_string()), None));
        assert_eq!(split_name("  "), (None, None));
    }

    #[test]
    fn amount_check() {
        assert!(amount_matches(10_000, Some(10_000)));
        assert!(amount_matches(10_000, None));
        assert!(!amount_matches(10_000, Some(9_999)));
    }
}
