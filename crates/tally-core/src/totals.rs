//! # Document Totals
//!
//! Discount, tax, round-off and grand total, plus the pipeline that chains
//! them over a document.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lines ──► subtotal ──► − header discount ──► taxable_amount            │
//! │                                                  │                      │
//! │                                  tax_amount ◄────┘  (signed: TDS −, TCS +)
//! │                                      │                                  │
//! │  taxable + tax + adjustment ──► pre_round ──► round_off (signed delta)  │
//! │                                                  │                      │
//! │  taxable + tax + adjustment + round_off ──► grand_total                 │
//! │                                                                         │
//! │  Every stage is pure. Only `adjustment` is user-entered.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::line::LineItem;
use crate::money::{checked_sum, percent_of, round2, round_whole};
use crate::types::{DiscountLevel, DocumentHeader, RoundingMode, TaxTreatment};
use crate::ZERO_MONEY;

// =============================================================================
// Calculators
// =============================================================================

/// Sum of every line's computed amount, rounded to 2 dp.
///
/// Uses [`LineItem::computed_amount`], not the cached `amount`, so a stale
/// cache can never leak into the totals.
pub fn subtotal(items: &[LineItem]) -> Decimal {
    let sum = checked_sum(items.iter().map(LineItem::computed_amount));
    round2(sum.unwrap_or_else(|| {
        warn!(lines = items.len(), "Subtotal overflowed, using zero");
        Decimal::ZERO
    }))
}

/// Header-level discount: `round2(base × percent / 100)`.
pub fn discount_amount(base: Decimal, percent: Decimal) -> Decimal {
    round2(percent_of(base, percent).unwrap_or(Decimal::ZERO))
}

/// Document-level tax, already signed for the treatment.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::totals::tax_amount;
/// use tally_core::TaxTreatment;
///
/// let base = Decimal::new(21240, 2);
/// assert_eq!(tax_amount(base, Decimal::from(5), TaxTreatment::Tds), Decimal::new(-1062, 2));
/// assert_eq!(tax_amount(base, Decimal::from(5), TaxTreatment::Tcs), Decimal::new(1062, 2));
/// ```
pub fn tax_amount(taxable_base: Decimal, rate_percent: Decimal, treatment: TaxTreatment) -> Decimal {
    let raw = round2(percent_of(taxable_base, rate_percent).unwrap_or(Decimal::ZERO));
    match treatment {
        TaxTreatment::Tds if !raw.is_zero() => -raw,
        TaxTreatment::Tds | TaxTreatment::Tcs => raw,
    }
}

/// Signed delta that brings `pre_round_total` to a whole figure.
///
/// Add the result to the total; it is not the rounded total itself.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::totals::round_off;
/// use tally_core::RoundingMode;
///
/// let total = Decimal::new(20178, 2); // 201.78
/// assert_eq!(round_off(total, RoundingMode::Nearest), Decimal::new(22, 2));
/// assert_eq!(round_off(total, RoundingMode::Floor), Decimal::new(-78, 2));
/// assert_eq!(round_off(total, RoundingMode::NoRounding), Decimal::ZERO);
/// ```
pub fn round_off(pre_round_total: Decimal, mode: RoundingMode) -> Decimal {
    let target = match mode {
        RoundingMode::NoRounding => return ZERO_MONEY,
        RoundingMode::Nearest => round_whole(pre_round_total),
        RoundingMode::Floor => pre_round_total.floor(),
        RoundingMode::Ceil => pre_round_total.ceil(),
    };
    round2(target.checked_sub(pre_round_total).unwrap_or(Decimal::ZERO))
}

/// `round2(subtotal + tax + adjustment + round_off)`. No clamping.
pub fn grand_total(
    subtotal: Decimal,
    tax_amount: Decimal,
    adjustment: Decimal,
    round_off: Decimal,
) -> Decimal {
    let sum = checked_sum([subtotal, tax_amount, adjustment, round_off]);
    round2(sum.unwrap_or_else(|| {
        warn!(%subtotal, %adjustment, "Grand total overflowed, using zero");
        Decimal::ZERO
    }))
}

// =============================================================================
// Document Totals
// =============================================================================

/// Derived aggregate over a document.
///
/// Every field except `adjustment` is a pure function of the lines and the
/// header; any stored copy is only a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    #[ts(type = "string")]
    pub subtotal: Decimal,
    /// Header discount. Zero for per-line documents.
    #[ts(type = "string")]
    pub discount_amount: Decimal,
    /// Subtotal minus header discount; the base the tax engine sees.
    #[ts(type = "string")]
    pub taxable_amount: Decimal,
    /// Signed: negative under TDS, positive under TCS.
    #[ts(type = "string")]
    pub tax_amount: Decimal,
    #[ts(type = "string")]
    pub adjustment: Decimal,
    #[ts(type = "string")]
    pub round_off: Decimal,
    #[ts(type = "string")]
    pub grand_total: Decimal,
}

/// Runs the full pipeline over a set of lines and header parameters.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::totals::compute_totals;
/// use tally_core::{DiscountLevel, DocumentHeader, LineItem, RoundingMode, TaxTreatment};
///
/// let lines = vec![LineItem::with_values(
///     Decimal::from(2),
///     Decimal::from(100),
///     Decimal::from(10),
///     Decimal::from(18),
/// )];
/// let header = DocumentHeader {
///     tax_treatment: Some(TaxTreatment::Tds),
///     tax_rate_percent: Decimal::from(5),
///     rounding_mode: RoundingMode::Nearest,
///     ..DocumentHeader::default()
/// };
///
/// let totals = compute_totals(&lines, &header, DiscountLevel::PerLine);
/// assert_eq!(totals.subtotal, Decimal::new(21240, 2));
/// assert_eq!(totals.tax_amount, Decimal::new(-1062, 2));
/// assert_eq!(totals.round_off, Decimal::new(22, 2));
/// assert_eq!(totals.grand_total, Decimal::from(202));
/// ```
pub fn compute_totals(
    lines: &[LineItem],
    header: &DocumentHeader,
    discount_level: DiscountLevel,
) -> DocumentTotals {
    let subtotal = subtotal(lines);

    let discount_amount = match discount_level {
        DiscountLevel::Header => discount_amount(subtotal, header.discount_percent),
        DiscountLevel::PerLine => ZERO_MONEY,
    };
    let taxable_amount = round2(subtotal.checked_sub(discount_amount).unwrap_or_else(|| {
        warn!(%subtotal, %discount_amount, "Taxable amount overflowed, using zero");
        Decimal::ZERO
    }));

    let tax_amount = match header.tax_treatment {
        Some(treatment) => tax_amount(taxable_amount, header.tax_rate_percent, treatment),
        None => ZERO_MONEY,
    };

    let pre_round = grand_total(taxable_amount, tax_amount, header.adjustment, Decimal::ZERO);
    let round_off = round_off(pre_round, header.rounding_mode);
    let grand_total = grand_total(taxable_amount, tax_amount, header.adjustment, round_off);

    DocumentTotals {
        subtotal,
        discount_amount,
        taxable_amount,
        tax_amount,
        adjustment: header.adjustment,
        round_off,
        grand_total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
