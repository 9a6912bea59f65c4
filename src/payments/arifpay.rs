//! Arifpay checkout session client.
//!
//! Arifpay has no webhook signature, so notifications are always re-verified
//! through [`PaymentProvider::verify`] before a payment is trusted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    CheckoutRequest, PaymentError, PaymentMethod, PaymentProvider, ProviderCheckout,
    ProviderPaymentStatus, ProviderVerification, api_error, build_http_client, major_to_cents,
};

/// How long an Arifpay checkout session stays payable.
const SESSION_TTL_HOURS: i64 = 2;

/// Local wallets and banks offered on the hosted page.
const PAYMENT_METHODS: [&str; 5] = ["TELEBIRR", "CBE", "AWASH", "AMOLE", "BOA"];

#[derive(Clone)]
pub struct ArifpayClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for ArifpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArifpayClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    cancel_url: &'a str,
    success_url: &'a str,
    error_url: &'a str,
    notify_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    nonce: &'a str,
    payment_methods: &'a [&'a str],
    expire_date: String,
    items: Vec<SessionItem<'a>>,
    lang: &'a str,
}

#[derive(Debug, Serialize)]
struct SessionItem<'a> {
    name: &'a str,
    quantity: u32,
    price: f64,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    session_id: String,
    #[serde(default)]
    payment_url: Option<String>,
    #[serde(default)]
    total_amount: Value,
    #[serde(default)]
    transaction: Option<SessionTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTransaction {
    transaction_status: Option<String>,
}

/// Map an Arifpay transaction status onto ours.
fn map_status(status: Option<&str>) -> ProviderPaymentStatus {
    match status.map(str::to_ascii_uppercase).as_deref() {
        Some("SUCCESS") => ProviderPaymentStatus::Paid,
        Some("FAILED" | "CANCELLED" | "EXPIRED") => ProviderPaymentStatus::Failed,
        _ => ProviderPaymentStatus::Pending,
    }
}

impl ArifpayClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<SessionData, PaymentError> {
        let response = request.header("x-arifpay-key", &self.api_key).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let envelope = response.json::<Envelope<SessionData>>().await?;
        if envelope.error {
            return Err(PaymentError::UnexpectedResponse(format!(
                "arifpay error: {}",
                envelope.msg.unwrap_or_default()
            )));
        }
        envelope
            .data
            .ok_or_else(|| PaymentError::UnexpectedResponse("arifpay response without data".into()))
    }
}

#[async_trait]
impl PaymentProvider for ArifpayClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Arifpay
    }

    async fn initialize(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderCheckout, PaymentError> {
        let body = SessionBody {
            cancel_url: &request.cancel_url,
            success_url: &request.return_url,
            error_url: &request.cancel_url,
            notify_url: &request.callback_url,
            phone: request.phone.as_deref(),
            email: request.email.as_deref(),
            nonce: &request.tx_ref,
            payment_methods: &PAYMENT_METHODS,
            expire_date: (Utc::now() + chrono::Duration::hours(SESSION_TTL_HOURS))
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            items: vec![SessionItem {
                name: "Alga booking",
                quantity: 1,
                price: request.amount_cents as f64 / 100.0,
                description: &request.description,
            }],
            lang: "EN",
        };

        let session = self
            .send(
                self.client
                    .post(format!("{}/api/checkout/session", self.base_url))
                    .json(&body),
            )
            .await?;

        let checkout_url = session.payment_url.ok_or_else(|| {
            PaymentError::UnexpectedResponse("arifpay session without paymentUrl".into())
        })?;

        Ok(ProviderCheckout {
            reference: session.session_id,
            checkout_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<ProviderVerification, PaymentError> {
        let session = self
            .send(
                self.client
                    .get(format!("{}/api/checkout/session/{reference}", self.base_url)),
            )
            .await?;

        let status = map_status(
            session
                .transaction
                .as_ref()
                .and_then(|t| t.transaction_status.as_deref()),
        );

        Ok(ProviderVerification {
            reference: session.session_id,
            status,
            amount_cents: major_to_cents(&session.total_amount),
        })
    }
}
