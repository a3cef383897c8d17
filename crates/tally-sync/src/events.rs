//! # Change Events
//!
//! What flows between the form layer and the controller. Inbound events
//! carry raw values exactly as the form produced them; coercion happens in
//! the controller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::DocumentTotals;

/// A line input the form can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineField {
    Quantity,
    Rate,
    DiscountPercent,
    TaxPercent,
    /// A label such as "GST 12%"; sets both the label and the percent.
    TaxLabel,
}

impl std::fmt::Display for LineField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineField::Quantity => write!(f, "quantity"),
            LineField::Rate => write!(f, "rate"),
            LineField::DiscountPercent => write!(f, "discountPercent"),
            LineField::TaxPercent => write!(f, "taxPercent"),
            LineField::TaxLabel => write!(f, "taxLabel"),
        }
    }
}

/// One edit to one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub line_id: String,
    pub field: LineField,
    /// Raw form value: number, numeric string, label, blank or null.
    pub value: Value,
}

impl FieldChange {
    pub fn new(line_id: impl Into<String>, field: LineField, value: impl Into<Value>) -> Self {
        FieldChange {
            line_id: line_id.into(),
            field,
            value: value.into(),
        }
    }
}

/// One edit to a document-level parameter. Recomputes totals only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum HeaderChange {
    DiscountPercent(Value),
    /// "TDS", "TCS", or blank/null for none.
    TaxTreatment(Value),
    /// Numeric percent or a label such as "TDS 2%".
    TaxRate(Value),
    Adjustment(Value),
    RoundingMode(Value),
}

/// Published after every recomputation that moved the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsChanged {
    pub totals: DocumentTotals,
    /// Line amounts written back in this pass.
    pub writes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_change_from_form_json() {
        let change: FieldChange = serde_json::from_value(json!({
            "lineId": "row-1",
            "field": "discountPercent",
            "value": "12.5"
        }))
        .unwrap();
        assert_eq!(change, FieldChange::new("row-1", LineField::DiscountPercent, "12.5"));
    }

    #[test]
    fn test_header_change_tagged_json() {
        let change: HeaderChange =
            serde_json::from_value(json!({ "field": "roundingMode", "value": "nearest" })).unwrap();
        assert_eq!(change, HeaderChange::RoundingMode(json!("nearest")));
    }
}
