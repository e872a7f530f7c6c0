//! Money rounding and proration primitives.
//!
//! All amounts are `Decimal`, rounded to two places with midpoints away from
//! zero. Rounding happens once per component, never on intermediate ratios.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to [`MONEY_SCALE`] places, midpoint away from zero.
///
/// ```
/// use compensation_engine::calculation::round_money;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_money(Decimal::new(10005, 3)), Decimal::new(1001, 2));
/// assert_eq!(round_money(Decimal::new(-10005, 3)), Decimal::new(-1001, 2));
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Scales `component` by `payable_days / working_days`.
///
/// Returns zero when `working_days` is zero.
pub fn prorate(component: Decimal, payable_days: Decimal, working_days: Decimal) -> Decimal {
    if working_days.is_zero() {
        return Decimal::ZERO;
    }
    round_money(component * payable_days / working_days)
}

/// `amount / divisor` rounded to money, or zero for a zero divisor.
pub fn per_day(amount: Decimal, divisor: Decimal) -> Decimal {
    if divisor.is_zero() {
        return Decimal::ZERO;
    }
    round_money(amount / divisor)
}

/// `base × percentage / 100` rounded to money.
pub fn percentage_of(base: Decimal, percentage: Decimal) -> Decimal {
    round_money(base * percentage / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_full_attendance_keeps_component() {
        assert_eq!(prorate(dec("30000"), dec("26"), dec("26")), dec("30000"));
    }

    #[test]
    fn test_half_attendance_is_exactly_half() {
        assert_eq!(prorate(dec("30000"), dec("13"), dec("26")), dec("15000"));
        assert_eq!(prorate(dec("12345.67"), dec("13"), dec("26")), dec("6172.84"));
    }

    #[test]
    fn test_zero_working_days_prorates_to_zero() {
        assert_eq!(prorate(dec("30000"), dec("10"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_repeating_ratio_rounds_once() {
        // 10000 × 20 / 30 = 6666.666…
        assert_eq!(prorate(dec("10000"), dec("20"), dec("30")), dec("6666.67"));
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(dec("15000"), dec("12")), dec("1800"));
        assert_eq!(percentage_of(dec("20000"), dec("0.75")), dec("150"));
        assert_eq!(percentage_of(dec("19999.99"), dec("0.75")), dec("150.00"));
    }

    #[test]
    fn test_per_day() {
        assert_eq!(per_day(dec("30000"), dec("30")), dec("1000"));
        assert_eq!(per_day(dec("30000"), Decimal::ZERO), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_prorated_never_exceeds_component(
            cents in 0i64..100_000_000,
            working in 1u32..=31,
            payable_tenths in 0u32..=310,
        ) {
            let component = Decimal::new(cents, 2);
            let working = Decimal::from(working);
            let payable = Decimal::new(payable_tenths as i64, 1).min(working);
            let result = prorate(component, payable, working);
            prop_assert!(result >= Decimal::ZERO);
            prop_assert!(result <= component);
            prop_assert!(result.scale() <= MONEY_SCALE);
        }

        #[test]
        fn prop_zero_working_days_is_always_zero(cents in 0i64..100_000_000, payable in 0u32..31) {
            let result = prorate(Decimal::new(cents, 2), Decimal::from(payable), Decimal::ZERO);
            prop_assert_eq!(result, Decimal::ZERO);
        }
    }
}
