//! Business logic services.
//!
//! Services hold the rules that span more than one query: booking creation under a
//! row lock, payment finalization, payout runs. Handlers stay thin and call into them.

/// Booking creation and status changes
pub mod booking_service;
/// Alga Pay checkout and payment finalization
pub mod payment_service;
pub mod pricing;
/// Image upload validation and storage
pub mod upload_service;
/// Signup and API-key handling
pub mod user_service;
