//! Chapa client: hosted checkout, verification and bank transfers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    CheckoutRequest, PaymentError, PaymentMethod, PaymentProvider, PayoutTransfer,
    ProviderCheckout, ProviderPaymentStatus, ProviderVerification, TransferRequest, api_error,
    build_http_client, cents_to_major, major_to_cents,
};

/// Chapa limits the customization title to 16 characters.
const CHECKOUT_TITLE: &str = "Alga Pay";

#[derive(Clone)]
pub struct ChapaClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl std::fmt::Debug for ChapaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    amount: String,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    tx_ref: &'a str,
    callback_url: &'a str,
    return_url: &'a str,
    customization: Customization<'a>,
}

#[derive(Debug, Serialize)]
struct Customization<'a> {
    title: &'a str,
    description: &'a str,
}

/// Envelope every Chapa endpoint answers with.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Value,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    checkout_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    #[serde(default)]
    amount: Value,
    tx_ref: Option<String>,
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    account_name: &'a str,
    account_number: &'a str,
    amount: String,
    currency: &'a str,
    reference: &'a str,
    bank_code: &'a str,
}

impl ChapaClient {
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap Chapa's `{status, message, data}` envelope.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let envelope = response.json::<Envelope<T>>().await?;
        if envelope.status != "success" {
            return Err(PaymentError::UnexpectedResponse(format!(
                "chapa status '{}': {}",
                envelope.status, envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| PaymentError::UnexpectedResponse("chapa response without data".into()))
    }
}

#[async_trait]
impl PaymentProvider for ChapaClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Chapa
    }

    async fn initialize(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderCheckout, PaymentError> {
        let body = InitializeBody {
            amount: cents_to_major(request.amount_cents),
            currency: &request.currency,
            email: request.email.as_deref(),
            first_name: request.first_name.as_deref(),
            last_name: request.last_name.as_deref(),
            phone_number: request.phone.as_deref(),
            tx_ref: &request.tx_ref,
            callback_url: &request.callback_url,
            return_url: &request.return_url,
            customization: Customization {
                title: CHECKOUT_TITLE,
                description: &request.description,
            },
        };

        let data: InitializeData = self
            .send(self.client.post(self.url("/v1/transaction/initialize")).json(&body))
            .await?;

        Ok(ProviderCheckout {
            reference: request.tx_ref.clone(),
            checkout_url: data.checkout_url,
        })
    }

    async fn verify(&self, reference: &str) -> Result<ProviderVerification, PaymentError> {
        let data: VerifyData = self
            .send(
                self.client
                    .get(self.url(&format!("/v1/transaction/verify/{reference}"))),
            )
            .await?;

        let status = match data.status.as_str() {
            "success" => ProviderPaymentStatus::Paid,
            "pending" => ProviderPaymentStatus::Pending,
            _ => ProviderPaymentStatus::Failed,
        };

        Ok(ProviderVerification {
            reference: data.tx_ref.unwrap_or_else(|| reference.to_string()),
            status,
            amount_cents: major_to_cents(&data.amount),
        })
    }
}

#[async_trait]
impl PayoutTransfer for ChapaClient {
    async fn transfer(&self, request: &TransferRequest) -> Result<String, PaymentError> {
        let body = TransferBody {
            account_name: &request.account_name,
            account_number: &request.account_number,
            amount: cents_to_major(request.amount_cents),
            currency: &request.currency,
            reference: &request.reference,
            bank_code: &request.bank_code,
        };

        // Chapa answers with the queued transfer's reference as `data`
        let data: Value = self
            .send(self.client.post(self.url("/v1/transfers")).json(&body))
            .await?;

        Ok(data
            .as_str()
            .map_or_else(|| request.reference.clone(), str::to_string))
    }
}
