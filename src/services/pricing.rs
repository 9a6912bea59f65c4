//! Booking financial breakdown.
//!
//! Every booking total is split into the platform commission, the VAT owed on that
//! commission, and the host's share after ERCA withholding tax. Amounts are integer
//! santim (1/100 birr); rates are basis points so the arithmetic stays exact.
//!
//! | field       | formula                  |
//! |-------------|--------------------------|
//! | commission  | total × 12%              |
//! | vat         | commission × 15%         |
//! | host gross  | total − commission       |
//! | withholding | host gross × 2%          |
//! | host net    | host gross − withholding |
//!
//! VAT is carved out of the commission (the platform remits it), so the ledger
//! identity is `host_net + commission + withholding == total`.

use serde::Serialize;

/// Platform commission on the booking total (12%).
pub const COMMISSION_RATE_BPS: i64 = 1_200;

/// VAT on the platform commission (15%).
pub const VAT_RATE_BPS: i64 = 1_500;

/// ERCA withholding tax on the host's gross share (2%).
pub const WITHHOLDING_RATE_BPS: i64 = 200;

const BPS_DENOMINATOR: i128 = 10_000;

/// Result of splitting a booking total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingBreakdown {
    pub total_cents: i64,
    pub commission_cents: i64,
    pub vat_cents: i64,
    pub host_gross_cents: i64,
    pub withholding_cents: i64,
    pub host_net_cents: i64,
}

impl BookingBreakdown {
    /// Commission kept by the platform once VAT has been remitted.
    pub fn platform_net_cents(&self) -> i64 {
        self.commission_cents - self.vat_cents
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakdownError {
    #[error("Total amount must not be negative")]
    NegativeTotal,
}

/// Apply a basis-point rate to a non-negative amount, rounding half up.
fn apply_rate(amount_cents: i64, rate_bps: i64) -> i64 {
    let scaled = i128::from(amount_cents) * i128::from(rate_bps) + BPS_DENOMINATOR / 2;
    // rate_bps <= 10_000, so the quotient never exceeds amount_cents
    (scaled / BPS_DENOMINATOR) as i64
}

/// Split a booking total into commission, VAT, withholding and host payout.
///
/// # Errors
///
/// Returns [`BreakdownError::NegativeTotal`] for a negative total.
pub fn calculate_booking_breakdown(total_cents: i64) -> Result<BookingBreakdown, BreakdownError> {
    if total_cents < 0 {
        return Err(BreakdownError::NegativeTotal);
    }

    let commission_cents = apply_rate(total_cents, COMMISSION_RATE_BPS);
    let vat_cents = apply_rate(commission_cents, VAT_RATE_BPS);
    let host_gross_cents = total_cents - commission_cents;
    let withholding_cents = apply_rate(host_gross_cents, WITHHOLDING_RATE_BPS);
    let host_net_cents = host_gross_cents - withholding_cents;

    Ok(BookingBreakdown {
        total_cents,
        commission_cents,
        vat_cents,
        host_gross_cents,
        withholding_cents,
        host_net_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thousand_birr_booking() {
        let b = calculate_booking_breakdown(100_000).unwrap();

        assert_eq!(b.commission_cents, 12_000);
        assert_eq!(b.vat_cents, 1_800);
        assert_eq!(b.host_gross_cents, 88_000);
        assert_eq!(b.withholding_cents, 1_760);
        assert_eq!(b.host_net_cents, 86_240);
        assert_eq!(b.platform_net_cents(), 10_200);
    }

    #[test]
    fn zero_total_is_all_zero() {
        let b = calculate_booking_breakdown(0).unwrap();
        assert_eq!(b.commission_cents, 0);
        assert_eq!(b.vat_cents, 0);
        assert_eq!(b.host_net_cents, 0);
    }

    #[test]
    fn rounding_is_half_up() {
        // 12% of 1 santim is 0.12 -> 0; 12% of 5 is 0.6 -> 1
        assert_eq!(calculate_booking_breakdown(1).unwrap().commission_cents, 0);
        assert_eq!(calculate_booking_breakdown(5).unwrap().commission_cents, 1);
        // 12% of 125 is exactly 15
        assert_eq!(calculate_booking_breakdown(125).unwrap().commission_cents, 15);
    }

    #[test]
    fn negative_total_is_rejected() {
        assert_eq!(
            calculate_booking_breakdown(-1),
            Err(BreakdownError::NegativeTotal)
        );
    }

    #[test]
    fn largest_total_does_not_overflow() {
        let b = calculate_booking_breakdown(i64::MAX).unwrap();
        assert_eq!(
            i128::from(b.host_net_cents) + i128::from(b.commission_cents) + i128::from(b.withholding_cents),
            i128::from(i64::MAX)
        );
    }

    proptest! {
        #[test]
        fn parts_reconcile_to_total(total in 0i64..1_000_000_000_000) {
            let b = calculate_booking_breakdown(total).unwrap();
            prop_assert_eq!(b.host_net_cents + b.commission_cents + b.withholding_cents, total);
            prop_assert_eq!(b.host_gross_cents, total - b.commission_cents);
            prop_assert!(b.vat_cents <= b.commission_cents);
            prop_assert!(b.host_net_cents >= 0);
        }

        #[test]
        fn amounts_track_the_exact_rates(total in 0i64..1_000_000_000_000) {
            let b = calculate_booking_breakdown(total).unwrap();
            let t = i128::from(total);

            // commission = 0.12T, within half a santim
            prop_assert!((i128::from(b.commission_cents) * 10_000 - 1_200 * t).abs() <= 5_000);
            // VAT = 0.018T, within 0.575 santim (two roundings)
            prop_assert!((i128::from(b.vat_cents) * 1_000 - 18 * t).abs() <= 575);
            // host net = T - 0.12T - 0.88T * 0.02 = 0.8624T, within one santim
            prop_assert!((i128::from(b.host_net_cents) * 10_000 - 8_624 * t).abs() <= 10_000);
        }
    }
}
