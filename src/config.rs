//! Application configuration management.
//!
//! Configuration is read from environment variables with `envy`, after an optional
//! `.env` file has been loaded by `dotenvy`. Payment provider credentials are all
//! optional: a provider whose key is missing is simply not registered with Alga Pay.

use anyhow::Context;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PUBLIC_APP_URL` / `PUBLIC_API_URL`: base URLs used for provider redirects and callbacks
/// - `CHAPA_*`, `STRIPE_*`, `ARIFPAY_*`: payment provider credentials and base URLs
/// - `UPLOAD_DIR`, `UPLOAD_PUBLIC_URL`, `UPLOAD_MAX_BYTES`: image upload storage
/// - `PAYOUT_ENABLED`, `PAYOUT_INTERVAL_SECS`: host payout job schedule
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_app_url")]
    pub public_app_url: String,

    #[serde(default = "default_api_url")]
    pub public_api_url: String,

    /// Allowed CORS origin for the web client. Any origin when unset.
    pub cors_origin: Option<String>,

    /// `json` for structured log output, anything else for compact text.
    pub log_format: Option<String>,

    pub chapa_secret_key: Option<String>,
    pub chapa_webhook_secret: Option<String>,
    #[serde(default = "default_chapa_base_url")]
    pub chapa_base_url: String,

    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    #[serde(default = "default_stripe_base_url")]
    pub stripe_base_url: String,

    pub arifpay_api_key: Option<String>,
    #[serde(default = "default_arifpay_base_url")]
    pub arifpay_base_url: String,

    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    #[serde(default = "default_upload_public_url")]
    pub upload_public_url: String,

    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: usize,

    #[serde(default = "default_true")]
    pub payout_enabled: bool,

    #[serde(default = "default_payout_interval_secs")]
    pub payout_interval_secs: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_app_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_chapa_base_url() -> String {
    "https://api.chapa.co".to_string()
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_arifpay_base_url() -> String {
    "https://gateway.arifpay.net".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    15
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_upload_public_url() -> String {
    "http://localhost:3000/uploads".to_string()
}

/// 5 MiB
fn default_upload_max_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_payout_interval_secs() -> u64 {
    3600
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are converted automatically: chapa_secret_key -> CHAPA_SECRET_KEY
        envy::from_env::<Config>()
    }

    /// Check that every configured URL parses.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first variable that is not a valid absolute URL.
    pub fn validate(&self) -> anyhow::Result<()> {
        let urls = [
            ("PUBLIC_APP_URL", Some(self.public_app_url.as_str())),
            ("PUBLIC_API_URL", Some(self.public_api_url.as_str())),
            ("UPLOAD_PUBLIC_URL", Some(self.upload_public_url.as_str())),
            ("CHAPA_BASE_URL", Some(self.chapa_base_url.as_str())),
            ("STRIPE_BASE_URL", Some(self.stripe_base_url.as_str())),
            ("ARIFPAY_BASE_URL", Some(self.arifpay_base_url.as_str())),
            ("CORS_ORIGIN", self.cors_origin.as_deref()),
        ];

        for (name, value) in urls {
            if let Some(value) = value {
                url::Url::parse(value).with_context(|| format!("{name} is not a valid URL: {value}"))?;
            }
        }

        if self.payout_interval_secs == 0 {
            anyhow::bail!("PAYOUT_INTERVAL_SECS must be greater than zero");
        }

        Ok(())
    }

    /// Whether log output should be JSON.
    pub fn json_logs(&self) -> bool {
        self.log_format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = from_pairs(&[("DATABASE_URL", "postgres://localhost/alga")]).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.chapa_base_url, "https://api.chapa.co");
        assert_eq!(config.stripe_base_url, "https://api.stripe.com");
        assert_eq!(config.upload_max_bytes, 5 * 1024 * 1024);
        assert!(config.payout_enabled);
        assert_eq!(config.payout_interval_secs, 3600);
        assert!(config.chapa_secret_key.is_none());
        assert!(!config.json_logs());
    }

    #[test]
    fn invalid_urls_fail_validation() {
        let ok = from_pairs(&[("DATABASE_URL", "postgres://localhost/alga")]).unwrap();
        assert!(ok.validate().is_ok());

        let bad = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/alga"),
            ("PUBLIC_APP_URL", "not a url"),
        ])
        .unwrap();
        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("PUBLIC_APP_URL"), "{err}");

        let zero = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/alga"),
            ("PAYOUT_INTERVAL_SECS", "0"),
        ])
        .unwrap();
        assert!(zero.validate().is_err());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(from_pairs(&[("SERVER_PORT", "8080")]).is_err());
    }

    #[test]
    fn provider_credentials_and_overrides_are_read() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/alga"),
            ("SERVER_PORT", "8080"),
            ("CHAPA_SECRET_KEY", "CHASECK_TEST-abc"),
            ("PAYOUT_ENABLED", "false"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.chapa_secret_key.as_deref(), Some("CHASECK_TEST-abc"));
        assert!(!config.payout_enabled);
        assert!(config.json_logs());
    }
}
