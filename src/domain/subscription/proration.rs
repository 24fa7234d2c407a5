//! Linear day-ratio proration for mid-period plan changes.
//!
//! The local ledger is authoritative: processors are used as payment rails
//! and never asked to prorate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{prorate, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proration {
    pub total_days: i64,
    pub remaining_days: i64,
    /// Unused share of the current plan.
    pub refund_cents: i64,
    /// Share of the new plan for the rest of the period.
    pub new_charge_cents: i64,
    /// Amount to collect now; never negative.
    pub prorated_delta_cents: i64,
}

impl Proration {
    fn zero(total_days: i64) -> Self {
        Self {
            total_days,
            remaining_days: 0,
            refund_cents: 0,
            new_charge_cents: 0,
            prorated_delta_cents: 0,
        }
    }
}

/// Computes the proration for switching from `current_amount` to `new_amount`
/// at `now` inside the period `[period_start, period_end)`.
///
/// Day counts are whole days. An elapsed or empty period yields all zeros.
pub fn calculate_proration(
    period_start: Timestamp,
    period_end: Timestamp,
    now: Timestamp,
    current_amount_cents: i64,
    new_amount_cents: i64,
) -> Proration {
    let total_days = period_end.days_since(&period_start);
    if total_days <= 0 {
        return Proration::zero(total_days);
    }
    let remaining_days = period_end.days_since(&now).clamp(0, total_days);

    let refund_cents = prorate(current_amount_cents, remaining_days, total_days);
    let new_charge_cents = prorate(new_amount_cents, remaining_days, total_days);

    Proration {
        total_days,
        remaining_days,
        refund_cents,
        new_charge_cents,
        prorated_delta_cents: (new_charge_cents - refund_cents).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn day(n: i64) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).add_days(n)
    }

    #[test]
    fn full_period_remaining_uses_full_amounts() {
        let p = calculate_proration(day(0), day(30), day(0), 1_000, 3_000);
        assert_eq!(p.remaining_days, 30);
        assert_eq!(p.refund_cents, 1_000);
        assert_eq!(p.new_charge_cents, 3_000);
        assert_eq!(p.prorated_delta_cents, 2_000);
    }

    #[test]
    fn no_days_remaining_yields_zero() {
        let p = calculate_proration(day(0), day(30), day(30), 1_000, 3_000);
        assert_eq!(p.remaining_days, 0);
        assert_eq!(p.prorated_delta_cents, 0);
    }

    #[test]
    fn past_period_end_clamps_to_zero() {
        let p = calculate_proration(day(0), day(30), day(45), 1_000, 3_000);
        assert_eq!(p.remaining_days, 0);
        assert_eq!(p.prorated_delta_cents, 0);
    }

    #[test]
    fn empty_period_does_not_divide_by_zero() {
        let p = calculate_proration(day(5), day(5), day(5), 1_000, 3_000);
        assert_eq!(p.total_days, 0);
        assert_eq!(p.prorated_delta_cents, 0);
    }

    #[test]
    fn downgrade_never_goes_negative() {
        let p = calculate_proration(day(0), day(30), day(10), 3_000, 1_000);
        assert_eq!(p.refund_cents, 2_000);
        assert_eq!(p.new_charge_cents, 667);
        assert_eq!(p.prorated_delta_cents, 0);
    }

    #[test]
    fn midway_upgrade() {
        let p = calculate_proration(day(0), day(30), day(15), 2_000, 4_000);
        assert_eq!(p.remaining_days, 15);
        assert_eq!(p.prorated_delta_cents, 1_000);
    }

    proptest! {
        #[test]
        fn delta_is_bounded(
            total in 0i64..400,
            elapsed in -10i64..500,
            current in 0i64..1_000_000,
            new in 0i64..1_000_000,
        ) {
            let p = calculate_proration(day(0), day(total), day(elapsed), current, new);
            prop_assert!(p.prorated_delta_cents >= 0);
            prop_assert!(p.prorated_delta_cents <= new);
            prop_assert!(p.remaining_days >= 0);
            prop_assert!(p.remaining_days <= total.max(0));
        }
    }
}
