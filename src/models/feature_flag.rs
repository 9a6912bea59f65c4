//! Feature flags toggled by admins and read by the web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FeatureFlag {
    pub name: String,
    pub enabled: bool,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeatureFlagRequest {
    pub enabled: bool,
    pub description: Option<String>,
}

/// Flag names are lowercase identifiers such as `instant_booking`.
pub fn is_valid_flag_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_names() {
        assert!(is_valid_flag_name("instant_booking"));
        assert!(is_valid_flag_name("alga-pay-v2"));
        assert!(!is_valid_flag_name(""));
        assert!(!is_valid_flag_name("Instant Booking"));
        assert!(!is_valid_flag_name(&"x".repeat(65)));
    }
}
