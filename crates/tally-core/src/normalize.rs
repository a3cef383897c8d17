//! # Record Normalization
//!
//! Maps the duck-typed records the form layer and the item directory hand
//! us onto canonical [`LineItem`] / [`Document`] shapes, once, at the
//! boundary. The calculators never see an alias.
//!
//! ## Field Aliases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Canonical          Accepted keys (first present wins)                  │
//! │  ────────────────   ──────────────────────────────────────────────────  │
//! │  quantity           quantity, qty                          default 1    │
//! │  rate               <kind preferred>, rate, price, unitPrice,           │
//! │                     sellingPrice, costPrice                default 0    │
//! │  discount_percent   discountPercent, discount              default 0    │
//! │  tax_percent        taxPercent, taxRate (numeric)                       │
//! │                     tax, taxLabel (label: "GST 12%")       default 0    │
//! │                                                                         │
//! │  <kind preferred> = sellingPrice for sales documents,                   │
//! │                     costPrice for purchase documents                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Normalization never fails. Unknown labels fall back to defaults with a
//! warning.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::coerce::{parse_percentage_label, to_number};
use crate::document::Document;
use crate::line::LineItem;
use crate::types::{DocumentHeader, DocumentKind, RoundingMode, TaxTreatment};
use crate::DEFAULT_QUANTITY;

const RATE_FALLBACKS: [&str; 5] = ["rate", "price", "unitPrice", "sellingPrice", "costPrice"];

/// First key that is present and not null.
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first(obj, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalizes one raw line record.
///
/// Non-object input yields a blank line.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use serde_json::json;
/// use tally_core::normalize::normalize_line;
/// use tally_core::DocumentKind;
///
/// let raw = json!({ "qty": "2", "sellingPrice": 100, "discount": "10", "tax": "GST 18%" });
/// let line = normalize_line(&raw, DocumentKind::Invoice);
/// assert_eq!(line.computed_amount(), Decimal::new(21240, 2));
/// assert_eq!(line.tax_label.as_deref(), Some("GST 18%"));
/// ```
pub fn normalize_line(raw: &Value, kind: DocumentKind) -> LineItem {
    let Some(obj) = raw.as_object() else {
        warn!(kind = %kind, "Line record is not an object, using a blank line");
        return LineItem::new();
    };

    let number = |keys: &[&str], default: Decimal| {
        first(obj, keys).map_or(default, |v| to_number(v, default))
    };

    let preferred = kind.preferred_rate_field();
    let rate = match first(obj, &[preferred]) {
        Some(v) => to_number(v, Decimal::ZERO),
        None => number(&RATE_FALLBACKS, Decimal::ZERO),
    };

    // A numeric percent wins over a label; the label is still kept.
    let tax_label = text(obj, &["tax", "taxLabel"]);
    let tax_percent = match first(obj, &["taxPercent", "taxRate"]) {
        Some(v) => parse_percentage_label(v),
        None => first(obj, &["tax", "taxLabel"]).map_or(Decimal::ZERO, parse_percentage_label),
    };

    LineItem {
        id: text(obj, &["id", "lineId"]).unwrap_or_else(|| Uuid::new_v4().to_string()),
        item_id: text(obj, &["itemId", "item"]),
        description: text(obj, &["description", "name", "itemName"]),
        quantity: number(&["quantity", "qty"], DEFAULT_QUANTITY),
        rate,
        discount_percent: number(&["discountPercent", "discount"], Decimal::ZERO),
        tax_percent,
        tax_label,
        amount: number(&["amount", "total"], Decimal::ZERO),
    }
}

/// Reads a tax treatment label. Blank or null means untaxed; unknown labels
/// are logged and also treated as untaxed.
pub fn tax_treatment_from_value(value: &Value) -> Option<TaxTreatment> {
    let label = match value {
        Value::String(s) if !s.trim().is_empty() => s.as_str(),
        _ => return None,
    };
    let parsed = TaxTreatment::from_label(label);
    if parsed.is_none() {
        warn!(label = %label, "Unknown tax treatment, treating as untaxed");
    }
    parsed
}

/// Reads a rounding mode label, falling back to no rounding.
pub fn rounding_mode_from_value(value: &Value) -> RoundingMode {
    match value {
        Value::String(label) => RoundingMode::from_label(label).unwrap_or_else(|| {
            warn!(label = %label, "Unknown rounding mode, not rounding");
            RoundingMode::NoRounding
        }),
        _ => RoundingMode::NoRounding,
    }
}

/// Normalizes the header fields of a raw document record.
pub fn normalize_header(raw: &Value) -> DocumentHeader {
    let Some(obj) = raw.as_object() else {
        return DocumentHeader::default();
    };

    let number = |keys: &[&str]| {
        first(obj, keys).map_or(Decimal::ZERO, |v| to_number(v, Decimal::ZERO))
    };

    DocumentHeader {
        discount_percent: number(&["discountPercent", "discount"]),
        tax_treatment: first(obj, &["taxType", "taxTreatment"]).and_then(tax_treatment_from_value),
        tax_rate_percent: first(obj, &["taxRate", "taxPercent", "tax", "taxLabel"])
            .map_or(Decimal::ZERO, parse_percentage_label),
        adjustment: number(&["adjustment"]),
        rounding_mode: first(obj, &["roundingMode", "roundOff", "rounding"])
            .map(rounding_mode_from_value)
            .unwrap_or_default(),
    }
}

/// Normalizes a whole raw document record: header fields plus
/// `items` / `lineItems`.
pub fn normalize_document(raw: &Value, kind: DocumentKind) -> Document {
    let lines = raw
        .as_object()
        .and_then(|obj| first(obj, &["items", "lineItems", "lines"]))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|i| normalize_line(i, kind)).collect())
        .unwrap_or_default();

    Document::with_lines(kind, normalize_header(raw), lines)
}

// =============================================================================
// Unit Tests
// =============================================================================
