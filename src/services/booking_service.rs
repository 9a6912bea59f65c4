//! Booking service: creation under a property lock and status changes.
//!
//! # Atomicity Guarantees
//!
//! Creation locks the property row (`FOR UPDATE`) before checking for overlapping
//! bookings, so two concurrent requests for the same dates serialize and the second
//! one sees the first one's row.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        booking::{Booking, BookingStatus, CreateBookingRequest},
        property::Property,
    },
    services::pricing::calculate_booking_breakdown,
};

/// Nights between two dates. At least one night is required.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, AppError> {
    let nights = (check_out - check_in).num_days();
    if nights < 1 {
        return Err(AppError::InvalidRequest(
            "Check-out must be at least one night after check-in".to_string(),
        ));
    }
    Ok(nights)
}

/// `nights × price`, rejecting totals that do not fit in santim.
pub fn booking_total(price_per_night_cents: i64, nights: i64) -> Result<i64, AppError> {
    price_per_night_cents
        .checked_mul(nights)
        .ok_or_else(|| AppError::InvalidRequest("Booking total is too large".to_string()))
}

fn active_statuses() -> Vec<String> {
    BookingStatus::ACTIVE
        .iter()
        .map(|status| status.as_str().to_string())
        .collect()
}

/// Create a pending booking for `guest_id`.
///
/// # Process
///
/// 1. Validate dates and guest count shape
/// 2. Lock the property row
/// 3. Reject own-property bookings, too many guests, and overlapping active bookings
/// 4. Compute the total and its breakdown
/// 5. Insert and commit
///
/// # Errors
///
/// - `InvalidRequest`: bad dates or guest count
/// - `NotFound`: property missing or inactive
/// - `Forbidden`: a host booking their own property
/// - `Conflict`: dates overlap an active booking
pub async fn create_booking(
    pool: &DbPool,
    guest_id: Uuid,
    request: CreateBookingRequest,
) -> Result<Booking, AppError> {
    let nights = nights_between(request.check_in, request.check_out)?;
    if request.guests < 1 {
        return Err(AppError::InvalidRequest(
            "At least one guest is required".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let property = sqlx::query_as::<_, Property>(
        "SELECT * FROM properties WHERE id = $1 AND is_active = true FOR UPDATE",
    )
    .bind(request.property_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Property"))?;

    if property.host_id == guest_id {
        return Err(AppError::Forbidden(
            "Hosts cannot book their own property".to_string(),
        ));
    }

    if request.guests > property.max_guests {
        return Err(AppError::InvalidRequest(format!(
            "This property accepts at most {} guests",
            property.max_guests
        )));
    }

    // Half-open ranges: a check-out day may be the next guest's check-in day.
    let overlapping: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE property_id = $1
              AND status = ANY($2)
              AND check_in < $4
              AND check_out > $3
        )
        "#,
    )
    .bind(property.id)
    .bind(active_statuses())
    .bind(request.check_in)
    .bind(request.check_out)
    .fetch_one(&mut *tx)
    .await?;

    if overlapping {
        return Err(AppError::Conflict(
            "The property is already booked for these dates".to_string(),
        ));
    }

    let total_cents = booking_total(property.price_per_night_cents, nights)?;
    let breakdown = calculate_booking_breakdown(total_cents)?;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            property_id, guest_id, check_in, check_out, guests, nights,
            total_cents, commission_cents, vat_cents, host_gross_cents,
            withholding_cents, host_net_cents, currency, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending')
        RETURNING *
        "#,
    )
    .bind(property.id)
    .bind(guest_id)
    .bind(request.check_in)
    .bind(request.check_out)
    .bind(request.guests)
    .bind(nights as i32)
    .bind(breakdown.total_cents)
    .bind(breakdown.commission_cents)
    .bind(breakdown.vat_cents)
    .bind(breakdown.host_gross_cents)
    .bind(breakdown.withholding_cents)
    .bind(breakdown.host_net_cents)
    .bind(&property.currency)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        property_id = %property.id,
        nights,
        total_cents,
        platform_net_cents = breakdown.platform_net_cents(),
        "booking created"
    );

    Ok(booking)
}

/// Booking visible to `actor`: its guest, the property's host, or an admin.
///
/// Anyone else gets `NotFound`, so booking ids cannot be probed.
pub async fn find_visible_booking(
    pool: &DbPool,
    booking_id: Uuid,
    actor: &AuthContext,
) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>(
        r#"
        SELECT b.*
        FROM bookings b
        JOIN properties p ON p.id = b.property_id
        WHERE b.id = $1 AND ($3 OR b.guest_id = $2 OR p.host_id = $2)
        "#,
    )
    .bind(booking_id)
    .bind(actor.user_id)
    .bind(actor.role.is_admin())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Booking"))
}

/// Who may move a booking into `next`.
///
/// `is_guest` / `is_host` describe the actor's relation to this booking.
pub fn authorize_transition(
    actor: &AuthContext,
    is_guest: bool,
    is_host: bool,
    next: BookingStatus,
) -> Result<(), AppError> {
    let is_admin = actor.role.is_admin();
    let allowed = match next {
        BookingStatus::Confirmed => is_admin,
        BookingStatus::CheckedIn | BookingStatus::Completed => is_host || is_admin,
        BookingStatus::Cancelled => is_guest || is_host || is_admin,
        // Never a valid target; the transition check reports it.
        BookingStatus::Pending => true,
    };

    if allowed {
        Ok(())
    } else if next == BookingStatus::Confirmed {
        Err(AppError::Forbidden(
            "Bookings are confirmed by payment".to_string(),
        ))
    } else {
        Err(AppError::Forbidden(format!(
            "You cannot mark this booking as {next}"
        )))
    }
}

/// Move a booking to `next` on behalf of `actor`.
///
/// # Errors
///
/// - `NotFound`: booking missing or not visible to the actor
/// - `Forbidden`: actor may not set this status
/// - `InvalidTransition`: `current -> next` is not allowed
pub async fn update_status(
    pool: &DbPool,
    booking_id: Uuid,
    actor: &AuthContext,
    next: BookingStatus,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Booking"))?;

    let host_id: Uuid = sqlx::query_scalar("SELECT host_id FROM properties WHERE id = $1")
        .bind(booking.property_id)
        .fetch_one(&mut *tx)
        .await?;

    let is_guest = booking.guest_id == actor.user_id;
    let is_host = host_id == actor.user_id;
    if !(is_guest || is_host || actor.role.is_admin()) {
        return Err(AppError::NotFound("Booking"));
    }

    authorize_transition(actor, is_guest, is_host, next)?;
    let current = booking.status()?;
    current.transition_to(next)?;

    let updated = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(next.as_str())
    .bind(booking_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        booking_id = %booking_id,
        from = %current,
        to = %next,
        actor = %actor.user_id,
        actor_name = %actor.full_name,
        "booking status changed"
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn actor(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            full_name: "Test User".to_string(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn nights_are_counted_between_dates() {
        assert_eq!(nights_between(date("2025-03-01"), date("2025-03-04")).unwrap(), 3);
        assert_eq!(nights_between(date("2025-02-28"), date("2025-03-01")).unwrap(), 1);
    }

    #[test]
    fn zero_or_negative_stays_are_rejected() {
        assert!(nights_between(date("2025-03-01"), date("2025-03-01")).is_err());
        assert!(nights_between(date("2025-03-04"), date("2025-03-01")).is_err());
    }

    #[test]
    fn total_is_nights_times_price() {
        assert_eq!(booking_total(350_000, 3).unwrap(), 1_050_000);
        assert!(booking_total(i64::MAX, 2).is_err());
    }

    #[test]
    fn only_admins_confirm_manually() {
        let guest = actor(UserRole::Guest);
        let host = actor(UserRole::Host);
        let admin = actor(UserRole::Admin);

        assert!(matches!(
            authorize_transition(&guest, true, false, BookingStatus::Confirmed),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize_transition(&host, false, true, BookingStatus::Confirmed).is_err());
        assert!(authorize_transition(&admin, false, false, BookingStatus::Confirmed).is_ok());
    }

    #[test]
    fn host_checks_in_and_completes() {
        let host = actor(UserRole::Host);
        let guest = actor(UserRole::Guest);

        assert!(authorize_transition(&host, false, true, BookingStatus::CheckedIn).is_ok());
        assert!(authorize_transition(&host, false, true, BookingStatus::Completed).is_ok());
        assert!(authorize_transition(&guest, true, false, BookingStatus::CheckedIn).is_err());
        assert!(authorize_transition(&guest, true, false, BookingStatus::Completed).is_err());
    }

    #[test]
    fn any_party_can_cancel() {
        let guest = actor(UserRole::Guest);
        let host = actor(UserRole::Host);
        let stranger = actor(UserRole::Dellala);

        assert!(authorize_transition(&guest, true, false, BookingStatus::Cancelled).is_ok());
        assert!(authorize_transition(&host, false, true, BookingStatus::Cancelled).is_ok());
        assert!(authorize_transition(&stranger, false, false, BookingStatus::Cancelled).is_err());
    }
}
