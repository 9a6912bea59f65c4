//! Users, roles and API-key signup types.
//!
//! Every caller authenticates with an API key issued at signup. Only the SHA-256
//! digest of the key is stored; the key itself is returned exactly once.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Marketplace role.
///
/// - `guest`: books properties
/// - `host`: lists properties and receives payouts
/// - `dellala`: commission-earning agent
/// - `admin`: operates the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    Host,
    Dellala,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Guest => "guest",
            UserRole::Host => "host",
            UserRole::Dellala => "dellala",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Hosts and admins may list properties.
    pub fn can_host(&self) -> bool {
        matches!(self, UserRole::Host | UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(UserRole::Guest),
            "host" => Ok(UserRole::Host),
            "dellala" => Ok(UserRole::Dellala),
            "admin" => Ok(UserRole::Admin),
            other => Err(AppError::InvalidRequest(format!("Unknown role '{other}'"))),
        }
    }
}

/// Row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    /// SHA-256 hex digest of the API key
    pub api_key_hash: String,
    pub is_active: bool,
    pub payout_account_name: Option<String>,
    pub payout_account_number: Option<String>,
    pub payout_bank_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Signup request.
///
/// ```json
/// { "full_name": "Almaz Bekele", "email": "almaz@example.com", "role": "host" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Guest
}

/// Bank account that receives host payouts.
#[derive(Debug, Deserialize)]
pub struct PayoutAccountRequest {
    pub account_name: String,
    pub account_number: String,
    pub bank_code: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub payout_account: Option<PayoutAccountSummary>,
    pub created_at: DateTime<Utc>,
}

/// Payout account with the number masked to its last four digits.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PayoutAccountSummary {
    pub account_name: String,
    pub account_number_last4: String,
    pub bank_code: String,
}

/// Signup response. `api_key` is never shown again.
#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub api_key: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let payout_account = match (
            user.payout_account_name,
            user.payout_account_number,
            user.payout_bank_code,
        ) {
            (Some(account_name), Some(number), Some(bank_code)) => Some(PayoutAccountSummary {
                account_name,
                account_number_last4: last4(&number),
                bank_code,
            }),
            _ => None,
        };

        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            payout_account,
            created_at: user.created_at,
        }
    }
}

fn last4(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            full_name: "Almaz Bekele".to_string(),
            email: "almaz@example.com".to_string(),
            phone: None,
            role: "host".to_string(),
            api_key_hash: "hash".to_string(),
            is_active: true,
            payout_account_name: Some("Almaz Bekele".to_string()),
            payout_account_number: Some("1000123456789".to_string()),
            payout_bank_code: Some("946".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn roles_parse_and_print() {
        for role in [UserRole::Guest, UserRole::Host, UserRole::Dellala, UserRole::Admin] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("owner".parse::<UserRole>().is_err());
        assert!(UserRole::Admin.can_host());
        assert!(!UserRole::Dellala.can_host());
    }

    #[test]
    fn response_masks_account_number_and_drops_hash() {
        let response = UserResponse::from(user());
        let account = response.payout_account.as_ref().unwrap();
        assert_eq!(account.account_number_last4, "6789");

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("api_key_hash").is_none());
    }

    #[test]
    fn incomplete_payout_account_is_omitted() {
        let mut user = user();
        user.payout_bank_code = None;
        assert!(UserResponse::from(user).payout_account.is_none());
    }

    #[test]
    fn signup_defaults_to_guest() {
        let request: CreateUserRequest =
            serde_json::from_str(r#"{"full_name":"A","email":"a@b.c"}"#).unwrap();
        assert_eq!(request.role, UserRole::Guest);
    }
}
