//! Payment attempts and Alga Pay request/response shapes.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    payments::{PaymentMethod, ProviderPaymentStatus, alga_pay::BRAND},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown payment status '{other}'"
            ))),
        }
    }
}

/// Row of the `payments` table. One row per checkout attempt.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub method: String,
    /// Our reference, sent to the provider (`alga-<uuid>`)
    pub tx_ref: String,
    /// Provider's own reference (Stripe session id, Arifpay session id)
    pub provider_reference: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub checkout_url: Option<String>,
    /// Why the payment needs manual follow-up, if it does
    pub review_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reasons a provider-side payment was recorded but not applied normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    /// Provider charged a different amount than the booking total.
    AmountMismatch,
    /// Money arrived after the booking left `pending` (cancelled or already paid).
    BookingNotPending,
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::AmountMismatch => "amount_mismatch",
            ReviewReason::BookingNotPending => "booking_not_pending",
        }
    }
}

impl Payment {
    pub fn method(&self) -> Result<PaymentMethod, AppError> {
        Ok(self.method.parse::<PaymentMethod>()?)
    }

    pub fn status(&self) -> Result<PaymentStatus, AppError> {
        self.status.parse()
    }

    /// Reference the provider expects when verifying this payment.
    pub fn verification_reference(&self) -> &str {
        self.provider_reference.as_deref().unwrap_or(&self.tx_ref)
    }
}

/// Checkout request.
///
/// ```json
/// { "booking_id": "550e8400-...", "method": "chapa", "email": "guest@example.com" }
/// ```
///
/// The amount is always taken from the booking.
#[derive(Debug, Deserialize)]
pub struct AlgaPayRequest {
    pub booking_id: Uuid,
    pub method: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlgaPayResponse {
    pub success: bool,
    pub provider: &'static str,
    pub method: PaymentMethod,
    pub payment_id: Uuid,
    pub tx_ref: String,
    pub checkout_url: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentVerificationResponse {
    pub success: bool,
    pub provider: &'static str,
    pub tx_ref: String,
    pub booking_id: Uuid,
    pub payment_status: String,
    pub provider_status: ProviderPaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
}

impl PaymentVerificationResponse {
    pub fn new(payment: &Payment, provider_status: ProviderPaymentStatus) -> Self {
        Self {
            success: true,
            provider: BRAND,
            tx_ref: payment.tx_ref.clone(),
            booking_id: payment.booking_id,
            payment_status: payment.status.clone(),
            provider_status,
            review_reason: payment.review_reason.clone(),
        }
    }
}

/// Chapa webhook body (subset).
#[derive(Debug, Deserialize)]
pub struct ChapaWebhookEvent {
    #[serde(default)]
    pub event: Option<String>,
    pub tx_ref: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: serde_json::Value,
}

impl ChapaWebhookEvent {
    pub fn is_success(&self) -> bool {
        self.event.as_deref() == Some("charge.success") || self.status.as_deref() == Some("success")
    }
}

/// Stripe event envelope (subset).
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: crate::payments::stripe::CheckoutSession,
}

/// Arifpay notification body (subset). Always re-verified through the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArifpayNotification {
    pub session_id: String,
}

/// Acknowledgement returned to provider webhooks.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapa_success_event_detection() {
        let event: ChapaWebhookEvent = serde_json::from_str(
            r#"{"event":"charge.success","tx_ref":"alga-1","status":"success","amount":"100.00"}"#,
        )
        .unwrap();
        assert!(event.is_success());

        let failed: ChapaWebhookEvent =
            serde_json::from_str(r#"{"event":"charge.failed","tx_ref":"alga-1","status":"failed"}"#)
                .unwrap();
        assert!(!failed.is_success());
    }

    #[test]
    fn stripe_event_parses_session() {
        let event: StripeWebhookEvent = serde_json::from_str(
            r#"{
                "id": "evt_1",
                "type": "checkout.session.completed",
                "data": { "object": {
                    "id": "cs_1", "payment_status": "paid", "status": "complete",
                    "amount_total": 5000, "client_reference_id": "alga-9"
                } }
            }"#,
        )
        .unwrap();

        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object.client_reference_id.as_deref(), Some("alga-9"));
        assert_eq!(event.data.object.provider_status(), ProviderPaymentStatus::Paid);
    }

    #[test]
    fn verification_reference_prefers_provider_reference() {
        let mut payment = Payment {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            method: "stripe".to_string(),
            tx_ref: "alga-1".to_string(),
            provider_reference: Some("cs_1".to_string()),
            amount_cents: 100,
            currency: "ETB".to_string(),
            status: "pending".to_string(),
            checkout_url: None,
            review_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(payment.verification_reference(), "cs_1");
        assert_eq!(payment.method().unwrap(), PaymentMethod::Stripe);

        payment.provider_reference = None;
        assert_eq!(payment.verification_reference(), "alga-1");
    }
}
