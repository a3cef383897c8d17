//! # tally-core: Pure Totals Engine
//!
//! This crate is the **heart** of Tally. It turns a list of line items and a
//! handful of document-level parameters into a consistent set of derived
//! numbers: line amount, subtotal, discount, tax, round-off and grand total.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Document forms (external, TypeScript)              │   │
//! │  │    Invoice ── Bill ── Purchase Order ── Quote ── Credit Note    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ field edits                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tally-sync (recompute-on-change)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐   │   │
//! │  │  │  coerce  │ │   line   │ │  totals  │ │ document         │   │   │
//! │  │  │ to_number│ │ LineItem │ │ tax      │ │ normalize        │   │   │
//! │  │  │ labels   │ │ amount   │ │ round-off│ │ snapshot         │   │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └──────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO TIMERS • NO GLOBAL STATE • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`coerce`] - Safe conversion of arbitrary input to numbers
//! - [`money`] - Rounding helpers (2 dp, half away from zero)
//! - [`line`] - Line items and the line amount calculator
//! - [`totals`] - Discount, tax, round-off and grand total
//! - [`types`] - Tax treatment, rounding mode, document kinds
//! - [`document`] - Per-document aggregate and submission snapshot
//! - [`normalize`] - Mapping duck-typed external records to canonical shapes
//! - [`error`] - Errors for label parsing at the edges
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, one pass converges
//! 2. **Exact Decimals**: every value is a `rust_decimal::Decimal`
//! 3. **Never Fail**: bad input degrades to a default, calculators return no `Result`
//! 4. **Signed Tax**: the tax engine returns an already-signed value
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::line::line_amount;
//! use tally_core::totals::{grand_total, round_off, tax_amount};
//! use tally_core::{RoundingMode, TaxTreatment};
//!
//! let amount = line_amount(
//!     Decimal::from(2),
//!     Decimal::from(100),
//!     Decimal::from(10),
//!     Decimal::from(18),
//! );
//! assert_eq!(amount, Decimal::new(21240, 2));
//!
//! let tax = tax_amount(amount, Decimal::from(5), TaxTreatment::Tds);
//! assert_eq!(tax, Decimal::new(-1062, 2));
//!
//! let pre_round = grand_total(amount, tax, Decimal::ZERO, Decimal::ZERO);
//! let delta = round_off(pre_round, RoundingMode::Nearest);
//! assert_eq!(grand_total(amount, tax, Decimal::ZERO, delta), Decimal::from(202));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coerce;
pub mod document;
pub mod error;
pub mod line;
pub mod money;
pub mod normalize;
pub mod totals;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::{Document, DocumentSnapshot};
pub use error::{CoreError, CoreResult};
pub use line::{LineBreakdown, LineItem};
pub use totals::DocumentTotals;
pub use types::*;

use rust_decimal::Decimal;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Decimal places every derived money value is rounded to.
pub const MONEY_DECIMALS: u32 = 2;

/// Absolute difference below which a recomputed amount counts as unchanged.
///
/// One cent. Anything smaller is noise from a stored value that carried more
/// precision than the engine produces, not a user-visible change.
pub const WRITE_BACK_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Zero at money precision, so it prints as `0.00`.
pub const ZERO_MONEY: Decimal = Decimal::from_parts(0, 0, 0, false, 2);

/// Quantity given to a freshly added line.
pub const DEFAULT_QUANTITY: Decimal = Decimal::ONE;
