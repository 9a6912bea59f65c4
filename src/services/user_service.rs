//! User signup and API-key handling.
//!
//! Keys are 32 random bytes, hex encoded and prefixed with `alga_`. Only the SHA-256
//! digest is stored, so a lost key cannot be recovered, only replaced.

use sha2::{Digest, Sha256};

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{CreateUserRequest, PayoutAccountRequest, User, UserRole},
};

const API_KEY_PREFIX: &str = "alga_";

/// Generate a fresh plaintext API key.
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{API_KEY_PREFIX}{}", hex::encode(bytes))
}

/// SHA-256 hex digest of `api_key`, as stored in `users.api_key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

fn validate_signup(request: &CreateUserRequest) -> Result<(), AppError> {
    if request.full_name.trim().is_empty() {
        return Err(AppError::InvalidRequest("Full name is required".to_string()));
    }
    let email = request.email.trim();
    if email.len() < 3 || !email.contains('@') {
        return Err(AppError::InvalidRequest(
            "A valid email address is required".to_string(),
        ));
    }
    if request.role == UserRole::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }
    Ok(())
}

/// Register a user and return the row together with the plaintext key.
///
/// # Errors
///
/// - `InvalidRequest`: missing name or malformed email
/// - `Forbidden`: the request asked for the admin role
/// - `Conflict`: the email is already registered
pub async fn create_user(
    pool: &DbPool,
    request: CreateUserRequest,
) -> Result<(User, String), AppError> {
    validate_signup(&request)?;

    let api_key = generate_api_key();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (full_name, email, phone, role, api_key_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.full_name.trim())
    .bind(request.email.trim().to_lowercase())
    .bind(request.phone)
    .bind(request.role.as_str())
    .bind(hash_api_key(&api_key))
    .fetch_one(pool)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Email is already registered".to_string())
        }
        other => AppError::Database(other),
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((user, api_key))
}

pub async fn find_user(pool: &DbPool, user_id: uuid::Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Store the bank account that receives the caller's payouts.
pub async fn set_payout_account(
    pool: &DbPool,
    user_id: uuid::Uuid,
    request: PayoutAccountRequest,
) -> Result<User, AppError> {
    let account_number = request.account_number.trim();
    if request.account_name.trim().is_empty()
        || request.bank_code.trim().is_empty()
        || account_number.len() < 4
        || !account_number.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AppError::InvalidRequest(
            "Account name, bank code and a numeric account number are required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET payout_account_name = $1,
            payout_account_number = $2,
            payout_bank_code = $3
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(request.account_name.trim())
    .bind(account_number)
    .bind(request.bank_code.trim())
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User"))?;

    tracing::info!(user_id = %user.id, "payout account updated");

    Ok(user)
}
