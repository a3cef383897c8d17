//! # Document Aggregate
//!
//! The explicit per-document state that every calculator is handed: the
//! kind, the header parameters and the lines. Each open form owns exactly
//! one; nothing is shared between documents.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Document::new(kind) ──► add_line() ──► edit fields ──► totals()       │
//! │                              │               │             │            │
//! │                              │               ▼             │            │
//! │                              │        line_mut(id)         │            │
//! │                              ▼                             ▼            │
//! │                        remove_line(id)               snapshot()         │
//! │                                                     (at submission)     │
//! │                                                                         │
//! │  Totals are recomputed on demand, never stored on the document.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::line::LineItem;
use crate::totals::{compute_totals, DocumentTotals};
use crate::types::{DiscountLevel, DocumentHeader, DocumentKind};

// =============================================================================
// Document
// =============================================================================

/// One open document: header parameters plus its lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub kind: DocumentKind,
    pub header: DocumentHeader,
    lines: Vec<LineItem>,
}

impl Document {
    /// Creates an empty document of the given kind.
    pub fn new(kind: DocumentKind) -> Self {
        Document {
            kind,
            header: DocumentHeader::default(),
            lines: Vec::new(),
        }
    }

    /// Creates a document from already-built lines.
    pub fn with_lines(kind: DocumentKind, header: DocumentHeader, lines: Vec<LineItem>) -> Self {
        Document {
            kind,
            header,
            lines,
        }
    }

    /// Appends a blank row and returns its id.
    pub fn add_line(&mut self) -> String {
        self.add_line_item(LineItem::new())
    }

    /// Appends an existing row and returns its id.
    pub fn add_line_item(&mut self, item: LineItem) -> String {
        let id = item.id.clone();
        self.lines.push(item);
        id
    }

    /// Removes a row. Returns false if no row had that id.
    pub fn remove_line(&mut self, id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != id);
        self.lines.len() != before
    }

    /// Looks up a row by id.
    pub fn line(&self, id: &str) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Mutable lookup by id.
    pub fn line_mut(&mut self, id: &str) -> Option<&mut LineItem> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    /// All rows in display order.
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Where this document applies its discount.
    pub fn discount_level(&self) -> DiscountLevel {
        self.kind.discount_level()
    }

    /// Recomputes every cached line amount that drifted by at least
    /// `tolerance`. Returns the number of writes.
    pub fn sync_amounts(&mut self, tolerance: Decimal) -> usize {
        self.lines
            .iter_mut()
            .map(|l| l.sync_amount(tolerance))
            .filter(|wrote| *wrote)
            .count()
    }

    /// Derived totals for the current lines and header.
    pub fn totals(&self) -> DocumentTotals {
        compute_totals(&self.lines, &self.header, self.discount_level())
    }

    /// Freezes the current state for the document-repository client.
    ///
    /// Line amounts in the snapshot are exact recomputations, whatever the
    /// cache held.
    pub fn snapshot(&self) -> DocumentSnapshot {
        let lines = self
            .lines
            .iter()
            .cloned()
            .map(|mut l| {
                l.amount = l.computed_amount();
                l
            })
            .collect();

        DocumentSnapshot {
            kind: self.kind,
            header: self.header.clone(),
            lines,
            totals: self.totals(),
            taken_at: Utc::now(),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A converged copy of a document, taken at submission time.
///
/// Never read back as authoritative state: reload the lines and recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub kind: DocumentKind,
    pub header: DocumentHeader,
    pub lines: Vec<LineItem>,
    pub totals: DocumentTotals,
    #[ts(as = "String")]
    pub taken_at: DateTime<Utc>,
}

impl DocumentSnapshot {
    /// Pretty JSON for submission or display.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot produced by [`DocumentSnapshot::to_json`].
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuilds a live document from the snapshot's lines and header.
    pub fn into_document(self) -> Document {
        Document::with_lines(self.kind, self.header, self.lines)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RoundingMode, TaxTreatment};
    use crate::WRITE_BACK_TOLERANCE;
    use rust_decimal_macros::dec;

    fn reference_document() -> Document {
        let mut doc = Document::new(DocumentKind::Invoice);
        let id = doc.add_line();
        let line = doc.line_mut(&id).unwrap();
        line.quantity = dec!(2);
        line.rate = dec!(100);
        line.discount_percent = dec!(10);
        line.tax_percent = dec!(18);
        doc.header.tax_treatment = Some(TaxTreatment::Tds);
        doc.header.tax_rate_percent = dec!(5);
        doc.header.rounding_mode = RoundingMode::Nearest;
        doc
    }

    #[test]
    fn test_add_and_remove_lines() {
        let mut doc = Document::new(DocumentKind::Bill);
        let a = doc.add_line();
        let b = doc.add_line();
        assert_eq!(doc.lines().len(), 2);

        assert!(doc.remove_line(&a));
        assert!(!doc.remove_line(&a));
        assert_eq!(doc.lines().len(), 1);
        assert!(doc.line(&b).is_some());
    }

    #[test]
    fn test_end_to_end_totals() {
        let doc = reference_document();
        let totals = doc.totals();
        assert_eq!(totals.subtotal, dec!(212.40));
        assert_eq!(totals.tax_amount, dec!(-10.62));
        assert_eq!(totals.round_off, dec!(0.22));
        assert_eq!(totals.grand_total, dec!(202.00));
    }

    #[test]
    fn test_sync_amounts_counts_writes() {
        let mut doc = reference_document();
        doc.add_line();
        // Reference line is stale (amount 0, should be 212.40); blank line is not.
        assert_eq!(doc.sync_amounts(WRITE_BACK_TOLERANCE), 1);
        assert_eq!(doc.sync_amounts(WRITE_BACK_TOLERANCE), 0);
    }

    #[test]
    fn test_snapshot_has_exact_amounts() {
        let doc = reference_document();
        assert_eq!(doc.lines()[0].amount, dec!(0));

        let snap = doc.snapshot();
        assert_eq!(snap.lines[0].amount, dec!(212.40));
        assert_eq!(snap.totals, doc.totals());
        // The live document is untouched.
        assert_eq!(doc.lines()[0].amount, dec!(0));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snap = reference_document().snapshot();
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"grandTotal\": \"202.00\""));
        assert!(json.contains("\"taxTreatment\": \"TDS\""));

        let parsed = DocumentSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snap);
        assert_eq!(parsed.into_document().totals(), snap.totals);
    }

    #[test]
    fn test_snapshot_from_bad_json_is_error() {
        assert!(DocumentSnapshot::from_json("{\"kind\":").is_err());
    }
}
