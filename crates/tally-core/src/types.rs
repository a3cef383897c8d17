//! # Domain Types
//!
//! Enumerations and header parameters shared by every document form.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  TaxTreatment   │   │  RoundingMode   │   │  DocumentKind   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Tds  (−tax)    │   │  NoRounding     │   │  Invoice        │       │
//! │  │  Tcs  (+tax)    │   │  Nearest        │   │  Bill           │       │
//! │  └─────────────────┘   │  Floor          │   │  PurchaseOrder  │       │
//! │                        │  Ceil           │   │  Quote ...      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ DocumentHeader                                                   │  │
//! │  │ discount_percent, tax_treatment, tax_rate_percent,               │  │
//! │  │ adjustment, rounding_mode                                        │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Tax Treatment
// =============================================================================

/// Which side of the transaction withholds the document-level tax.
///
/// ## Sign Convention
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────┐
/// │  TDS (Tax Deducted at Source)    raw tax → −raw                     │
/// │     payer withholds, total goes DOWN                                │
/// │                                                                     │
/// │  TCS (Tax Collected at Source)   raw tax → +raw                     │
/// │     seller collects, total goes UP                                  │
/// │                                                                     │
/// │  The tax engine applies the sign. Callers only ever ADD its result. │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TaxTreatment {
    /// Tax deducted at source, reduces the total.
    #[serde(rename = "TDS")]
    Tds,
    /// Tax collected at source, increases the total.
    #[serde(rename = "TCS")]
    Tcs,
}

impl TaxTreatment {
    /// Lenient label parse for form input. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        label.parse().ok()
    }
}

impl std::fmt::Display for TaxTreatment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxTreatment::Tds => write!(f, "TDS"),
            TaxTreatment::Tcs => write!(f, "TCS"),
        }
    }
}

impl std::str::FromStr for TaxTreatment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tds" | "tax deducted at source" => Ok(TaxTreatment::Tds),
            "tcs" | "tax collected at source" => Ok(TaxTreatment::Tcs),
            other => Err(CoreError::UnknownTaxTreatment(other.to_string())),
        }
    }
}

// =============================================================================
// Rounding Mode
// =============================================================================

/// How the pre-rounding total is nudged to a whole figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Leave the total as computed; round-off is always zero.
    #[default]
    NoRounding,
    /// Nearest whole unit, half away from zero.
    Nearest,
    /// Next whole unit toward negative infinity.
    Floor,
    /// Next whole unit toward positive infinity.
    Ceil,
}

impl RoundingMode {
    /// Lenient label parse for form input. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        label.parse().ok()
    }
}

impl std::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingMode::NoRounding => write!(f, "no_rounding"),
            RoundingMode::Nearest => write!(f, "nearest"),
            RoundingMode::Floor => write!(f, "floor"),
            RoundingMode::Ceil => write!(f, "ceil"),
        }
    }
}

impl std::str::FromStr for RoundingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "" | "none" | "no_rounding" | "off" => Ok(RoundingMode::NoRounding),
            "nearest" | "round" | "round_off" => Ok(RoundingMode::Nearest),
            "floor" | "down" | "round_down" => Ok(RoundingMode::Floor),
            "ceil" | "ceiling" | "up" | "round_up" => Ok(RoundingMode::Ceil),
            _ => Err(CoreError::UnknownRoundingMode(s.trim().to_string())),
        }
    }
}

// =============================================================================
// Document Kind
// =============================================================================

/// Where a document applies its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountLevel {
    /// Each line carries its own discount percent.
    PerLine,
    /// One discount percent applies to the whole subtotal.
    Header,
}

/// The accounting document a form edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Invoice,
    Bill,
    PurchaseOrder,
    Quote,
    CreditNote,
    RecurringInvoice,
    RecurringBill,
}

impl DocumentKind {
    /// Every kind, in display order.
    pub const ALL: [DocumentKind; 7] = [
        DocumentKind::Invoice,
        DocumentKind::Bill,
        DocumentKind::PurchaseOrder,
        DocumentKind::Quote,
        DocumentKind::CreditNote,
        DocumentKind::RecurringInvoice,
        DocumentKind::RecurringBill,
    ];

    /// Where this kind of document discounts.
    ///
    /// Invoices and quotes discount per line; the purchase side and credit
    /// notes take one discount across the subtotal.
    pub fn discount_level(&self) -> DiscountLevel {
        match self {
            DocumentKind::Invoice | DocumentKind::Quote | DocumentKind::RecurringInvoice => {
                DiscountLevel::PerLine
            }
            DocumentKind::Bill
            | DocumentKind::PurchaseOrder
            | DocumentKind::CreditNote
            | DocumentKind::RecurringBill => DiscountLevel::Header,
        }
    }

    /// True for documents we issue to customers.
    pub fn is_sales(&self) -> bool {
        matches!(
            self,
            DocumentKind::Invoice
                | DocumentKind::Quote
                | DocumentKind::CreditNote
                | DocumentKind::RecurringInvoice
        )
    }

    /// Field name that carries the unit rate in this kind's item directory.
    pub fn preferred_rate_field(&self) -> &'static str {
        if self.is_sales() {
            "sellingPrice"
        } else {
            "costPrice"
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Bill => "bill",
            DocumentKind::PurchaseOrder => "purchase_order",
            DocumentKind::Quote => "quote",
            DocumentKind::CreditNote => "credit_note",
            DocumentKind::RecurringInvoice => "recurring_invoice",
            DocumentKind::RecurringBill => "recurring_bill",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "invoice" => Ok(DocumentKind::Invoice),
            "bill" => Ok(DocumentKind::Bill),
            "purchase_order" | "po" => Ok(DocumentKind::PurchaseOrder),
            "quote" | "quotation" | "estimate" => Ok(DocumentKind::Quote),
            "credit_note" | "credit" => Ok(DocumentKind::CreditNote),
            "recurring_invoice" => Ok(DocumentKind::RecurringInvoice),
            "recurring_bill" => Ok(DocumentKind::RecurringBill),
            _ => Err(CoreError::UnknownDocumentKind(s.trim().to_string())),
        }
    }
}

// =============================================================================
// Document Header
// =============================================================================

/// Document-level parameters that feed the totals pipeline.
///
/// `adjustment` is the only free-form value; everything derived from the
/// header is recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHeader {
    /// Header discount percent. Ignored by per-line documents.
    #[ts(type = "string")]
    pub discount_percent: Decimal,

    /// TDS/TCS selection. `None` means no document-level tax.
    pub tax_treatment: Option<TaxTreatment>,

    /// Document-level tax rate percent.
    #[ts(type = "string")]
    pub tax_rate_percent: Decimal,

    /// User-entered adjustment, added as-is.
    #[ts(type = "string")]
    pub adjustment: Decimal,

    /// Round-off policy for the grand total.
    pub rounding_mode: RoundingMode,
}

// =============================================================================
// Unit Tests
// =============================================================================
