//! # Money Module
//!
//! Rounding and percentage helpers used by every calculator.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    212.40 - 212.39 = 0.010000000000019327  ❌ not one cent              │
//! │    1.005 × 100     = 100.49999999999999    ❌ rounds the wrong way      │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal                                          │
//! │    212.40 - 212.39 = 0.01                                              │
//! │    round2(1.005)   = 1.01 (half away from zero)                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow
//! `Decimal` panics on overflow with the plain operators. The helpers here
//! use checked arithmetic and hand back `None`, so the calculators can
//! degrade to zero instead of crashing on absurd input.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::MONEY_DECIMALS;

/// Rounds to 2 decimal places, half away from zero.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::money::round2;
///
/// assert_eq!(round2(Decimal::new(1005, 3)), Decimal::new(101, 2));   // 1.005 → 1.01
/// assert_eq!(round2(Decimal::new(-1005, 3)), Decimal::new(-101, 2)); // -1.005 → -1.01
/// assert_eq!(round2(Decimal::new(1004, 3)), Decimal::new(100, 2));   // 1.004 → 1.00
/// ```
///
/// The result always carries exactly two decimal places, so 212.4 prints
/// as `212.40`.
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DECIMALS);
    rounded
}

/// Rounds to a whole number, half away from zero.
#[inline]
pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `base × percent / 100`, unrounded. `None` on overflow.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::money::percent_of;
///
/// let twenty = percent_of(Decimal::from(200), Decimal::from(10));
/// assert_eq!(twenty, Some(Decimal::from(20)));
/// ```
#[inline]
pub fn percent_of(base: Decimal, percent: Decimal) -> Option<Decimal> {
    base.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}

/// Sums values with overflow checking. `None` on overflow.
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// True when `a` and `b` differ by less than `tolerance`.
///
/// A difference of exactly `tolerance` is a real change.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::money::within_tolerance;
/// use tally_core::WRITE_BACK_TOLERANCE;
///
/// let stored = Decimal::new(21240, 2);
/// assert!(within_tolerance(stored, Decimal::new(212_404, 3), WRITE_BACK_TOLERANCE));
/// assert!(!within_tolerance(stored, Decimal::new(21241, 2), WRITE_BACK_TOLERANCE));
/// ```
#[inline]
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    match a.checked_sub(b) {
        Some(diff) => diff.abs() < tolerance,
        None => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(2.355)), dec!(2.36));
        assert_eq!(round2(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round2(dec!(0.005)), dec!(0.01));
        assert_eq!(round2(dec!(10)), dec!(10));
        assert_eq!(round2(dec!(212.4)).to_string(), "212.40");
    }

    #[test]
    fn test_round_whole() {
        assert_eq!(round_whole(dec!(201.5)), dec!(202));
        assert_eq!(round_whole(dec!(-201.5)), dec!(-202));
        assert_eq!(round_whole(dec!(201.49)), dec!(201));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(180), dec!(18)), Some(dec!(32.4)));
        assert_eq!(percent_of(dec!(100), dec!(0)), Some(dec!(0)));
        assert_eq!(percent_of(dec!(-50), dec!(10)), Some(dec!(-5)));
    }

    #[test]
    fn test_percent_of_overflow_is_none() {
        assert_eq!(percent_of(Decimal::MAX, dec!(200)), None);
    }

    #[test]
    fn test_checked_sum() {
        assert_eq!(checked_sum([dec!(1.10), dec!(2.20)]), Some(dec!(3.30)));
        assert_eq!(checked_sum(Vec::<Decimal>::new()), Some(Decimal::ZERO));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::MAX]), None);
    }

    #[test]
    fn test_within_tolerance_boundary() {
        let tol = dec!(0.01);
        assert!(within_tolerance(dec!(10.00), dec!(10.009), tol));
        assert!(!within_tolerance(dec!(10.00), dec!(10.01), tol));
        assert!(!within_tolerance(dec!(10.00), dec!(9.99), tol));
    }
}
