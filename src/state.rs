//! Shared application state.
//!
//! Provider clients, storage and the payout job are created once at startup and
//! shared behind `Arc`s. Handlers that only need the pool keep extracting
//! `State<DbPool>` through the `FromRef` impls below.

use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;

use crate::{
    config::Config,
    db::DbPool,
    jobs::payout::PayoutJob,
    payments::{
        PaymentError, PayoutTransfer, alga_pay::AlgaPay, arifpay::ArifpayClient,
        chapa::ChapaClient, stripe::StripeClient,
    },
    storage::{LocalDiskStorage, ObjectStorage},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub alga_pay: Arc<AlgaPay>,
    pub storage: Arc<dyn ObjectStorage>,
    pub payouts: Arc<PayoutJob>,
}

impl AppState {
    /// Wire up providers from `config`. Providers without credentials are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(pool: DbPool, config: Config) -> Result<Self, PaymentError> {
        let timeout = Duration::from_secs(config.provider_timeout_secs);
        let mut alga_pay = AlgaPay::new();
        let mut transfer: Option<Arc<dyn PayoutTransfer>> = None;

        if let Some(key) = config.chapa_secret_key.as_deref() {
            let chapa = Arc::new(ChapaClient::new(key, &config.chapa_base_url, timeout)?);
            alga_pay = alga_pay.with_provider(chapa.clone());
            transfer = Some(chapa);
        }
        if let Some(key) = config.stripe_secret_key.as_deref() {
            alga_pay = alga_pay.with_provider(Arc::new(StripeClient::new(
                key,
                &config.stripe_base_url,
                timeout,
            )?));
        }
        if let Some(key) = config.arifpay_api_key.as_deref() {
            alga_pay = alga_pay.with_provider(Arc::new(ArifpayClient::new(
                key,
                &config.arifpay_base_url,
                timeout,
            )?));
        }

        tracing::info!(methods = ?alga_pay.configured_methods(), "alga pay providers registered");

        let storage = LocalDiskStorage::new(&config.upload_dir, &config.upload_public_url);
        let payouts = PayoutJob::new(pool.clone(), transfer);

        Ok(Self {
            pool,
            config: Arc::new(config),
            alga_pay: Arc::new(alga_pay),
            storage: Arc::new(storage),
            payouts: Arc::new(payouts),
        })
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
