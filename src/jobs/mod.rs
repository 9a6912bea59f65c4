//! Background jobs started from `main`.

pub mod payout;
