//! Alga Pay: one payment API in front of Chapa, Stripe and Arifpay.

use std::{fmt, sync::Arc};

use serde::Serialize;

use super::{
    CheckoutRequest, PaymentError, PaymentMethod, PaymentProvider, ProviderPaymentStatus,
};

/// Brand reported as the provider on every Alga Pay response.
pub const BRAND: &str = "Alga Pay";

/// Checkout created through Alga Pay.
#[derive(Debug, Clone, Serialize)]
pub struct AlgaPayCheckout {
    pub provider: &'static str,
    pub method: PaymentMethod,
    pub reference: String,
    pub checkout_url: String,
}

/// Verification result relabeled under the brand.
#[derive(Debug, Clone, Serialize)]
pub struct AlgaPayVerification {
    pub provider: &'static str,
    pub method: PaymentMethod,
    pub reference: String,
    pub status: ProviderPaymentStatus,
    pub amount_cents: Option<i64>,
}

/// Registry of configured providers, one slot per [`PaymentMethod`].
#[derive(Clone, Default)]
pub struct AlgaPay {
    chapa: Option<Arc<dyn PaymentProvider>>,
    stripe: Option<Arc<dyn PaymentProvider>>,
    arifpay: Option<Arc<dyn PaymentProvider>>,
}

impl fmt::Debug for AlgaPay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgaPay")
            .field("methods", &self.configured_methods())
            .finish()
    }
}

impl AlgaPay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` in the slot for its own method, replacing any previous one.
    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        let slot = match provider.method() {
            PaymentMethod::Chapa => &mut self.chapa,
            PaymentMethod::Stripe => &mut self.stripe,
            PaymentMethod::Arifpay => &mut self.arifpay,
        };
        *slot = Some(provider);
        self
    }

    /// Provider registered for `method`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NotConfigured`] when no credentials were supplied for it.
    pub fn provider(&self, method: PaymentMethod) -> Result<&Arc<dyn PaymentProvider>, PaymentError> {
        let slot = match method {
            PaymentMethod::Chapa => &self.chapa,
            PaymentMethod::Stripe => &self.stripe,
            PaymentMethod::Arifpay => &self.arifpay,
        };
        slot.as_ref().ok_or(PaymentError::NotConfigured(method))
    }

    pub fn configured_methods(&self) -> Vec<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|method| self.provider(*method).is_ok())
            .collect()
    }

    /// Create a hosted checkout with the provider behind `method`.
    ///
    /// # Errors
    ///
    /// Returns an error when the method is not configured or the provider call fails.
    pub async fn initialize(
        &self,
        method: PaymentMethod,
        request: &CheckoutRequest,
    ) -> Result<AlgaPayCheckout, PaymentError> {
        let checkout = self
            .provider(method)?
            .initialize(request)
            .await
            .inspect_err(|err| {
                tracing::error!(%method, tx_ref = %request.tx_ref, error = %err, "checkout initialization failed");
            })?;

        tracing::info!(%method, tx_ref = %request.tx_ref, reference = %checkout.reference, "checkout created");

        Ok(AlgaPayCheckout {
            provider: BRAND,
            method,
            reference: checkout.reference,
            checkout_url: checkout.checkout_url,
        })
    }

    /// Ask the provider behind `method` for the state of `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error when the method is not configured or the provider call fails.
    pub async fn verify(
        &self,
        method: PaymentMethod,
        reference: &str,
    ) -> Result<AlgaPayVerification, PaymentError> {
        let verification = self
            .provider(method)?
            .verify(reference)
            .await
            .inspect_err(|err| {
                tracing::error!(%method, reference, error = %err, "payment verification failed");
            })?;

        Ok(AlgaPayVerification {
            provider: BRAND,
            method,
            reference: verification.reference,
            status: verification.status,
            amount_cents: verification.amount_cents,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::payments::{ProviderCheckout, ProviderVerification};
    use async_trait::async_trait;

    /// Provider that answers from fixed values.
    pub(crate) struct FakeProvider {
        pub method: PaymentMethod,
        pub status: ProviderPaymentStatus,
        pub amount_cents: Option<i64>,
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        fn method(&self) -> PaymentMethod {
            self.method
        }

        async fn initialize(
            &self,
            request: &CheckoutRequest,
        ) -> Result<ProviderCheckout, PaymentError> {
            Ok(ProviderCheckout {
                reference: format!("{}-{}", self.method, request.tx_ref),
                checkout_url: format!("https://pay.test/{}", self.method),
            })
        }

        async fn verify(&self, reference: &str) -> Result<ProviderVerification, PaymentError> {
            Ok(ProviderVerification {
                reference: reference.to_string(),
                status: self.status,
                amount_cents: self.amount_cents,
            })
        }
    }

    pub(crate) fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            tx_ref: "alga-1".to_string(),
            amount_cents: 10_000,
            currency: "ETB".to_string(),
            description: "Booking".to_string(),
            email: None,
            first_name: None,
            last_name: None,
            phone: None,
            return_url: "http://app/return".to_string(),
            cancel_url: "http://app/cancel".to_string(),
            callback_url: "http://api/callback".to_string(),
        }
    }

    fn fake(method: PaymentMethod) -> Arc<dyn PaymentProvider> {
        Arc::new(FakeProvider {
            method,
            status: ProviderPaymentStatus::Paid,
            amount_cents: Some(10_000),
        })
    }

    #[tokio::test]
    async fn dispatches_by_method_and_relabels_provider() {
        let alga = AlgaPay::new()
            .with_provider(fake(PaymentMethod::Chapa))
            .with_provider(fake(PaymentMethod::Arifpay));

        let checkout = alga
            .initialize(PaymentMethod::Arifpay, &checkout_request())
            .await
            .unwrap();

        assert_eq!(checkout.provider, "Alga Pay");
        assert_eq!(checkout.method, PaymentMethod::Arifpay);
        assert_eq!(checkout.reference, "arifpay-alga-1");
        assert_eq!(checkout.checkout_url, "https://pay.test/arifpay");
    }

    #[tokio::test]
    async fn unconfigured_method_is_rejected() {
        let alga = AlgaPay::new().with_provider(fake(PaymentMethod::Chapa));

        let err = alga
            .initialize(PaymentMethod::Stripe, &checkout_request())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::NotConfigured(PaymentMethod::Stripe)));
        assert_eq!(alga.configured_methods(), vec![PaymentMethod::Chapa]);
    }

    #[tokio::test]
    async fn verification_is_branded() {
        let alga = AlgaPay::new().with_provider(fake(PaymentMethod::Stripe));

        let verification = alga.verify(PaymentMethod::Stripe, "cs_1").await.unwrap();

        assert_eq!(verification.provider, BRAND);
        assert_eq!(verification.status, ProviderPaymentStatus::Paid);
        assert_eq!(verification.reference, "cs_1");
    }

    #[test]
    fn branded_checkout_serializes_brand_not_processor() {
        let checkout = AlgaPayCheckout {
            provider: BRAND,
            method: PaymentMethod::Chapa,
            reference: "alga-1".to_string(),
            checkout_url: "https://x".to_string(),
        };
        let value = serde_json::to_value(&checkout).unwrap();
        assert_eq!(value["provider"], "Alga Pay");
        assert_eq!(value["method"], "chapa");
    }
}
