//! # Line Items
//!
//! One row of a document and the calculator for its amount.
//!
//! ## Order of Operations (fixed)
//! ```text
//! quantity × rate ─────────────► base            2 × 100      = 200.00
//!                                  │
//! base × discount% / 100 ────────► discount      200 × 10%    =  20.00
//!                                  │
//! base − discount ───────────────► after_discount               = 180.00
//!                                  │
//! after_discount × tax% / 100 ───► line_tax      180 × 18%    =  32.40
//!                                  │
//! round2(after_discount + tax) ──► amount                       = 212.40
//! ```
//!
//! Discount always comes before tax. Negative inputs are not clamped; a
//! negative quantity yields a negative amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use crate::money::{percent_of, round2, within_tolerance};
use crate::DEFAULT_QUANTITY;

// =============================================================================
// Line Amount Calculator
// =============================================================================

/// Intermediate steps of a line amount, for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakdown {
    #[ts(type = "string")]
    pub base: Decimal,
    #[ts(type = "string")]
    pub discount: Decimal,
    #[ts(type = "string")]
    pub after_discount: Decimal,
    #[ts(type = "string")]
    pub line_tax: Decimal,
    /// Final rounded amount.
    #[ts(type = "string")]
    pub amount: Decimal,
}

impl LineBreakdown {
    /// Runs the five steps. All-zero on arithmetic overflow.
    pub fn compute(
        quantity: Decimal,
        rate: Decimal,
        discount_percent: Decimal,
        tax_percent: Decimal,
    ) -> Self {
        let steps = || {
            let base = quantity.checked_mul(rate)?;
            let discount = percent_of(base, discount_percent)?;
            let after_discount = base.checked_sub(discount)?;
            let line_tax = percent_of(after_discount, tax_percent)?;
            let amount = round2(after_discount.checked_add(line_tax)?);
            Some(LineBreakdown {
                base,
                discount,
                after_discount,
                line_tax,
                amount,
            })
        };

        steps().unwrap_or_else(|| {
            warn!(%quantity, %rate, "Line amount overflowed, using zero");
            LineBreakdown::default()
        })
    }
}

/// Computes one line's amount: discount first, then tax, rounded to 2 dp.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::line::line_amount;
///
/// let amount = line_amount(
///     Decimal::from(2),   // quantity
///     Decimal::from(100), // rate
///     Decimal::from(10),  // discount %
///     Decimal::from(18),  // tax %
/// );
/// assert_eq!(amount, Decimal::new(21240, 2)); // 212.40
/// ```
pub fn line_amount(
    quantity: Decimal,
    rate: Decimal,
    discount_percent: Decimal,
    tax_percent: Decimal,
) -> Decimal {
    LineBreakdown::compute(quantity, rate, discount_percent, tax_percent).amount
}

// =============================================================================
// Line Item
// =============================================================================

/// One row of a document.
///
/// ## Design Notes
/// - `amount` is a cache for display and storage, never a source of truth.
/// - `tax_label` keeps the human label ("GST 12%") the percent came from.
/// - `item_id` / `description` ride along to the snapshot untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Row identity (UUID v4), stable for the life of the row.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[ts(type = "string")]
    pub quantity: Decimal,

    #[ts(type = "string")]
    pub rate: Decimal,

    #[ts(type = "string")]
    pub discount_percent: Decimal,

    #[ts(type = "string")]
    pub tax_percent: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_label: Option<String>,

    /// Cached result of [`LineItem::computed_amount`].
    #[ts(type = "string")]
    pub amount: Decimal,
}

impl LineItem {
    /// Creates a blank row: quantity 1, everything else zero.
    pub fn new() -> Self {
        LineItem {
            id: Uuid::new_v4().to_string(),
            item_id: None,
            description: None,
            quantity: DEFAULT_QUANTITY,
            rate: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
            tax_label: None,
            amount: Decimal::ZERO,
        }
    }

    /// Creates a row from the four inputs with its amount already computed.
    pub fn with_values(
        quantity: Decimal,
        rate: Decimal,
        discount_percent: Decimal,
        tax_percent: Decimal,
    ) -> Self {
        let mut item = LineItem {
            quantity,
            rate,
            discount_percent,
            tax_percent,
            ..LineItem::new()
        };
        item.amount = item.computed_amount();
        item
    }

    /// What `amount` should be for the current inputs.
    #[inline]
    pub fn computed_amount(&self) -> Decimal {
        line_amount(
            self.quantity,
            self.rate,
            self.discount_percent,
            self.tax_percent,
        )
    }

    /// The five intermediate steps for the current inputs.
    pub fn breakdown(&self) -> LineBreakdown {
        LineBreakdown::compute(
            self.quantity,
            self.rate,
            self.discount_percent,
            self.tax_percent,
        )
    }

    /// True when the stored amount has drifted from the inputs by at least
    /// `tolerance`.
    pub fn is_stale(&self, tolerance: Decimal) -> bool {
        !within_tolerance(self.computed_amount(), self.amount, tolerance)
    }

    /// Recomputes and writes `amount` back only if it moved by at least
    /// `tolerance`. Returns whether a write happened.
    ///
    /// A second call with unchanged inputs never writes, which is what
    /// stops a write from re-triggering its own change notification.
    pub fn sync_amount(&mut self, tolerance: Decimal) -> bool {
        let fresh = self.computed_amount();
        if within_tolerance(fresh, self.amount, tolerance) {
            return false;
        }
        self.amount = fresh;
        true
    }
}

impl Default for LineItem {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
