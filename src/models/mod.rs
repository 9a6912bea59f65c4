//! Data models representing database entities.
//!
//! Row structs map 1:1 to tables and derive `sqlx::FromRow`. Status columns are
//! stored as text and parsed into enums where the rules need them.

/// Consent records
pub mod consent;
/// Host dashboard aggregates
pub mod dashboard;
pub mod booking;
pub mod feature_flag;
/// Payment attempts and webhook payloads
pub mod payment;
pub mod payout;
pub mod property;
/// Users, roles and API-key signup
pub mod user;
pub mod verification;
