//! User consent records (terms, privacy, marketing, cookies).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentType {
    Terms,
    Privacy,
    Marketing,
    Cookies,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::Terms => "terms",
            ConsentType::Privacy => "privacy",
            ConsentType::Marketing => "marketing",
            ConsentType::Cookies => "cookies",
        }
    }
}

/// Row of the `consents` table. Rows are append-only; the newest per type wins.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Consent {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub consent_type: String,
    pub granted: bool,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

/// ```json
/// { "consent_type": "marketing", "granted": false, "version": "2025-01" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub consent_type: ConsentType,
    pub granted: bool,
    pub version: String,
}
