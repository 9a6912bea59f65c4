//! Payment provider integrations behind the Alga Pay brand.
//!
//! Each processor (Chapa, Stripe, Arifpay) implements [`PaymentProvider`] by
//! speaking its public HTTP API with `reqwest`. [`alga_pay::AlgaPay`] routes a
//! request to the right one by [`PaymentMethod`] and relabels the result so the
//! client never learns which processor handled it.

pub mod alga_pay;
pub mod arifpay;
pub mod chapa;
pub mod signature;
pub mod stripe;

use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Processor selected by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Chapa,
    Stripe,
    Arifpay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Chapa,
        PaymentMethod::Stripe,
        PaymentMethod::Arifpay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Chapa => "chapa",
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Arifpay => "arifpay",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chapa" => Ok(PaymentMethod::Chapa),
            "stripe" => Ok(PaymentMethod::Stripe),
            "arifpay" => Ok(PaymentMethod::Arifpay),
            _ => Err(PaymentError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Errors raised while talking to a payment provider.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Payment provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected payment provider response: {0}")]
    UnexpectedResponse(String),

    #[error("Alga Pay method '{0}' is not available")]
    NotConfigured(PaymentMethod),

    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,
}

/// Provider-neutral checkout request. The amount always comes from the stored booking.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Our reference, unique per payment attempt (`alga-<uuid>`).
    pub tx_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// Where the provider redirects the customer after paying.
    pub return_url: String,
    /// Where the provider redirects the customer on cancel.
    pub cancel_url: String,
    /// Server-to-server notification URL.
    pub callback_url: String,
}

/// Hosted checkout created by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCheckout {
    /// Reference used to verify the payment later (tx_ref or the provider's session id).
    pub reference: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPaymentStatus {
    Paid,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderVerification {
    pub reference: String,
    pub status: ProviderPaymentStatus,
    /// Amount the provider reports as charged, when it reports one.
    pub amount_cents: Option<i64>,
}

/// A payment processor reachable through Alga Pay.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Create a hosted checkout for `request`.
    async fn initialize(&self, request: &CheckoutRequest)
    -> Result<ProviderCheckout, PaymentError>;

    /// Ask the provider for the current state of a payment.
    async fn verify(&self, reference: &str) -> Result<ProviderVerification, PaymentError>;
}

/// Bank transfer to a host's payout account.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub reference: String,
    pub account_name: String,
    pub account_number: String,
    pub bank_code: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// Sends host payouts. Chapa is the only processor used for transfers.
#[async_trait]
pub trait PayoutTransfer: Send + Sync {
    /// Queue a transfer, returning the provider's transfer reference.
    async fn transfer(&self, request: &TransferRequest) -> Result<String, PaymentError>;
}

/// HTTP client shared by one provider.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, PaymentError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Turn a non-success provider response into [`PaymentError::Api`].
pub(crate) async fn api_error(response: reqwest::Response) -> PaymentError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    PaymentError::Api { status, message }
}

/// Format santim as a decimal birr string: `123456` -> `"1234.56"`.
pub fn cents_to_major(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Read a provider amount given in birr (number or numeric string) as santim.
pub fn major_to_cents(value: &serde_json::Value) -> Option<i64> {
    let major = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !major.is_finite() {
        return None;
    }
    Some((major * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("Chapa".parse::<PaymentMethod>().unwrap(), PaymentMethod::Chapa);
        assert_eq!(" STRIPE ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Stripe);
        assert_eq!("arifpay".parse::<PaymentMethod>().unwrap(), PaymentMethod::Arifpay);
        assert!(matches!(
            "telebirr".parse::<PaymentMethod>(),
            Err(PaymentError::UnsupportedMethod(m)) if m == "telebirr"
        ));
    }

    #[test]
    fn cents_format_as_birr() {
        assert_eq!(cents_to_major(123_456), "1234.56");
        assert_eq!(cents_to_major(5), "0.05");
        assert_eq!(cents_to_major(100), "1.00");
        assert_eq!(cents_to_major(-250), "-2.50");
    }

    #[test]
    fn provider_amounts_parse_to_cents() {
        assert_eq!(major_to_cents(&json!(1234.56)), Some(123_456));
        assert_eq!(major_to_cents(&json!("1234.50")), Some(123_450));
        assert_eq!(major_to_cents(&json!(100)), Some(10_000));
        assert_eq!(major_to_cents(&json!("abc")), None);
        assert_eq!(major_to_cents(&json!(null)), None);
    }
}
