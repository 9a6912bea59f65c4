//! Stripe Checkout Sessions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{
    CheckoutRequest, PaymentError, PaymentMethod, PaymentProvider, ProviderCheckout,
    ProviderPaymentStatus, ProviderVerification, api_error, build_http_client,
};

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Subset of a Checkout Session object.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub client_reference_id: Option<String>,
}

impl CheckoutSession {
    pub fn provider_status(&self) -> ProviderPaymentStatus {
        match (self.payment_status.as_deref(), self.status.as_deref()) {
            (Some("paid" | "no_payment_required"), _) => ProviderPaymentStatus::Paid,
            (_, Some("expired")) => ProviderPaymentStatus::Failed,
            _ => ProviderPaymentStatus::Pending,
        }
    }
}

impl StripeClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            secret_key: secret_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Form fields for a one-line-item payment session.
    fn session_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("mode", "payment".to_string()),
            ("success_url", request.return_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("client_reference_id", request.tx_ref.clone()),
            ("metadata[tx_ref]", request.tx_ref.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                request.currency.to_ascii_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.clone(),
            ),
        ];
        if let Some(email) = &request.email {
            form.push(("customer_email", email.clone()));
        }
        form
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<CheckoutSession, PaymentError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json::<CheckoutSession>().await?)
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    async fn initialize(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderCheckout, PaymentError> {
        let session = self
            .send(
                self.client
                    .post(format!("{}/v1/checkout/sessions", self.base_url))
                    .form(&Self::session_form(request)),
            )
            .await?;

        let checkout_url = session.url.ok_or_else(|| {
            PaymentError::UnexpectedResponse("stripe session without url".into())
        })?;

        Ok(ProviderCheckout {
            reference: session.id,
            checkout_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<ProviderVerification, PaymentError> {
        let session = self
            .send(
                self.client
                    .get(format!("{}/v1/checkout/sessions/{reference}", self.base_url)),
            )
            .await?;

        Ok(ProviderVerification {
            status: session.provider_status(),
            amount_cents: session.amount_total,
            reference: session.id,
        })
    }
}
