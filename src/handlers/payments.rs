//! Alga Pay endpoints.
//!
//! - POST /api/payments/alga-pay - Start a checkout for a pending booking
//! - GET /api/payments/alga-pay/verify/{tx_ref} - Ask the provider and apply the result
//! - POST /api/payments/webhooks/chapa - Signed Chapa notification
//! - POST /api/payments/webhooks/stripe - Signed Stripe event
//! - POST /api/payments/webhooks/arifpay - Unsigned; re-verified through the API
//!
//! Webhooks take the raw body because signatures are computed over the exact bytes.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::{
    error::AppError,
    extract::ApiJson,
    middleware::auth::AuthContext,
    models::payment::{
        AlgaPayRequest, ArifpayNotification, ChapaWebhookEvent, PaymentVerificationResponse,
        StripeWebhookEvent, WebhookAck,
    },
    payments::{PaymentError, PaymentMethod, ProviderPaymentStatus, major_to_cents, signature},
    services::payment_service,
    state::AppState,
};

const CHAPA_SIGNATURE_HEADERS: [&str; 2] = ["x-chapa-signature", "chapa-signature"];
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|err| AppError::InvalidRequest(format!("Invalid webhook payload: {err}")))
}

fn ack() -> Json<WebhookAck> {
    Json(WebhookAck { received: true })
}

/// Start an Alga Pay checkout.
///
/// # Request Body
///
/// ```json
/// {
///   "booking_id": "550e8400-e29b-41d4-a716-446655440000",
///   "method": "chapa",
///   "email": "guest@example.com"
/// }
/// ```
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "success": true,
///   "provider": "Alga Pay",
///   "method": "chapa",
///   "payment_id": "...",
///   "tx_ref": "alga-...",
///   "checkout_url": "https://checkout.chapa.co/...",
///   "amount_cents": 1050000,
///   "currency": "ETB"
/// }
/// ```
pub async fn create_alga_pay_checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<AlgaPayRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = payment_service::start_checkout(
        &state.pool,
        &state.alga_pay,
        &state.config,
        &auth,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn verify_alga_pay(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tx_ref): Path<String>,
) -> Result<Json<PaymentVerificationResponse>, AppError> {
    let response =
        payment_service::verify_payment(&state.pool, &state.alga_pay, &auth, &tx_ref).await?;
    Ok(Json(response))
}

/// Chapa webhook.
///
/// With `CHAPA_WEBHOOK_SECRET` set, the body must carry a valid HMAC signature and
/// its amount is trusted. Without it, the event only triggers a verify call.
pub async fn chapa_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signed = match state.config.chapa_webhook_secret.as_deref() {
        Some(secret) => {
            let signature = CHAPA_SIGNATURE_HEADERS
                .iter()
                .find_map(|name| header_str(&headers, name))
                .ok_or(PaymentError::InvalidSignature)?;
            signature::verify_chapa(secret, &body, signature)?;
            true
        }
        None => false,
    };

    let event: ChapaWebhookEvent = parse_body(&body)?;
    tracing::info!(tx_ref = %event.tx_ref, event = ?event.event, signed, "chapa webhook received");

    if !signed {
        if let Some(payment) =
            payment_service::find_payment_by_reference(&state.pool, &event.tx_ref).await?
        {
            payment_service::sync_with_provider(&state.pool, &state.alga_pay, &payment).await?;
        }
        return Ok(ack());
    }

    if event.is_success() {
        payment_service::finalize_paid(&state.pool, &event.tx_ref, major_to_cents(&event.amount))
            .await?;
    } else if event.status.as_deref() == Some("failed") {
        payment_service::mark_failed(&state.pool, &event.tx_ref).await?;
    }

    Ok(ack())
}

/// Stripe webhook. Requires `STRIPE_WEBHOOK_SECRET`.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or(PaymentError::NotConfigured(PaymentMethod::Stripe))?;
    let header = header_str(&headers, STRIPE_SIGNATURE_HEADER).ok_or(PaymentError::InvalidSignature)?;
    signature::verify_stripe(secret, &body, header, Utc::now().timestamp())?;

    let event: StripeWebhookEvent = parse_body(&body)?;
    let session = event.data.object;
    tracing::info!(event_id = %event.id, event_type = %event.event_type, session_id = %session.id, "stripe webhook received");

    let tx_ref = match session.client_reference_id.clone() {
        Some(tx_ref) => Some(tx_ref),
        None => payment_service::find_payment_by_reference(&state.pool, &session.id)
            .await?
            .map(|payment| payment.tx_ref),
    };
    let Some(tx_ref) = tx_ref else {
        tracing::warn!(session_id = %session.id, "stripe event for unknown session");
        return Ok(ack());
    };

    match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded"
            if session.provider_status() == ProviderPaymentStatus::Paid =>
        {
            payment_service::finalize_paid(&state.pool, &tx_ref, session.amount_total).await?;
        }
        "checkout.session.expired" | "checkout.session.async_payment_failed" => {
            payment_service::mark_failed(&state.pool, &tx_ref).await?;
        }
        _ => {}
    }

    Ok(ack())
}

/// Arifpay webhook. The notification is never trusted on its own: the session is
/// looked up and verified through the Arifpay API.
pub async fn arifpay_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let notification: ArifpayNotification = parse_body(&body)?;
    tracing::info!(session_id = %notification.session_id, "arifpay webhook received");

    match payment_service::find_payment_by_reference(&state.pool, &notification.session_id).await? {
        Some(payment) => {
            payment_service::sync_with_provider(&state.pool, &state.alga_pay, &payment).await?;
        }
        None => {
            tracing::warn!(session_id = %notification.session_id, "arifpay notification for unknown session");
        }
    }

    Ok(ack())
}
