//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, auth context)
//! 2. Calls a service or runs a single query
//! 3. Returns a JSON response or an [`AppError`](crate::error::AppError)

/// Booking and pricing endpoints
pub mod bookings;
pub mod consent;
/// Host dashboard aggregates
pub mod dashboard;
pub mod feature_flags;
pub mod health;
/// Alga Pay checkout, verification and provider webhooks
pub mod payments;
pub mod payouts;
pub mod properties;
pub mod uploads;
pub mod users;
/// ID document verification
pub mod verifications;
