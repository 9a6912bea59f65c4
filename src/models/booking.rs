//! Booking records, status progression and request/response types.
//!
//! # Status progression
//!
//! ```text
//! pending ──> confirmed ──> checked_in ──> completed
//!    │            │
//!    └────────────┴──> cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, services::pricing::BookingBreakdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that hold the property's dates.
    pub const ACTIVE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::CheckedIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, CheckedIn)
                | (CheckedIn, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    /// Check `self -> next`, returning the error handlers send back.
    pub fn transition_to(&self, next: BookingStatus) -> Result<BookingStatus, AppError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown booking status '{other}'"
            ))),
        }
    }
}

/// Row of the `bookings` table.
///
/// The breakdown columns are written once at creation from the total and never
/// recomputed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub nights: i32,
    pub total_cents: i64,
    pub commission_cents: i64,
    pub vat_cents: i64,
    pub host_gross_cents: i64,
    pub withholding_cents: i64,
    pub host_net_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn status(&self) -> Result<BookingStatus, AppError> {
        self.status.parse()
    }

    pub fn breakdown(&self) -> BookingBreakdown {
        BookingBreakdown {
            total_cents: self.total_cents,
            commission_cents: self.commission_cents,
            vat_cents: self.vat_cents,
            host_gross_cents: self.host_gross_cents,
            withholding_cents: self.withholding_cents,
            host_net_cents: self.host_net_cents,
        }
    }
}

/// ```json
/// {
///   "property_id": "550e8400-e29b-41d4-a716-446655440000",
///   "check_in": "2025-03-01",
///   "check_out": "2025-03-04",
///   "guests": 2
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub property_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: i32,
}

fn default_guests() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Public pricing preview.
#[derive(Debug, Deserialize)]
pub struct BreakdownRequest {
    pub total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub nights: i32,
    pub currency: String,
    pub status: String,
    pub breakdown: BookingBreakdown,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            breakdown: booking.breakdown(),
            id: booking.id,
            property_id: booking.property_id,
            guest_id: booking.guest_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            guests: booking.guests,
            nights: booking.nights,
            currency: booking.currency,
            status: booking.status,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 5] = [Pending, Confirmed, CheckedIn, Completed, Cancelled];

    #[test]
    fn linear_progression_is_allowed() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(Completed));
    }

    #[test]
    fn cancellation_only_before_check_in() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!CheckedIn.can_transition_to(Cancelled));
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!Pending.can_transition_to(CheckedIn));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!CheckedIn.can_transition_to(Confirmed));
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = Completed.transition_to(Pending).unwrap_err();
        assert_eq!(err.to_string(), "Cannot change status from completed to pending");
    }

    #[test]
    fn status_strings_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
    }
}
