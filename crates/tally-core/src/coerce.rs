//! # Numeric Coercion
//!
//! Turns whatever the form layer hands us into a usable `Decimal`.
//!
//! ## Coercion Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input                          to_number(v, d)   parse_percentage_label │
//! │  ─────────────────────────────  ───────────────   ────────────────────── │
//! │  null                           d                 0                      │
//! │  ""  / "   "                    d                 0                      │
//! │  "42"                           42                42                     │
//! │  "1e3"                          1000              1                      │
//! │  "abc"                          d                 0                      │
//! │  "GST 12%"                      d                 12                     │
//! │  5 (number)                     5                 5                      │
//! │  true / false                   1 / 0             0                      │
//! │  [..] / {..}                    d                 0                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in here can fail. A value that cannot become a finite number
//! becomes the caller's default instead.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// First integer or decimal run inside a label ("GST 12.5%" → "12.5").
static PERCENT_IN_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+)?|\.\d+").expect("percentage pattern is valid")
});

/// Converts an arbitrary JSON value to a finite decimal.
///
/// Returns `default` for null, blank strings, containers, and anything that
/// does not parse to a finite number.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use serde_json::json;
/// use tally_core::coerce::to_number;
///
/// assert_eq!(to_number(&json!(""), Decimal::from(7)), Decimal::from(7));
/// assert_eq!(to_number(&json!("abc"), Decimal::from(3)), Decimal::from(3));
/// assert_eq!(to_number(&json!("42"), Decimal::ZERO), Decimal::from(42));
/// ```
pub fn to_number(value: &Value, default: Decimal) -> Decimal {
    match value {
        Value::Null => default,
        Value::Bool(b) => {
            if *b {
                Decimal::ONE
            } else {
                Decimal::ZERO
            }
        }
        Value::Number(n) => number_to_decimal(n).unwrap_or(default),
        Value::String(s) => to_number_str(s, default),
        Value::Array(_) | Value::Object(_) => default,
    }
}

/// Converts text to a finite decimal, or `default`.
///
/// Accepts plain decimals, a leading `+`, scientific notation and `0x` hex.
pub fn to_number_str(text: &str, default: Decimal) -> Decimal {
    parse_decimal(text).unwrap_or(default)
}

/// Reduces a tax label (or a bare number) to a plain percentage.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use serde_json::json;
/// use tally_core::coerce::parse_percentage_label;
///
/// assert_eq!(parse_percentage_label(&json!("GST 12%")), Decimal::from(12));
/// assert_eq!(parse_percentage_label(&json!("")), Decimal::ZERO);
/// assert_eq!(parse_percentage_label(&json!(5)), Decimal::from(5));
/// assert_eq!(parse_percentage_label(&json!(null)), Decimal::ZERO);
/// ```
pub fn parse_percentage_label(value: &Value) -> Decimal {
    match value {
        Value::Number(_) => to_number(value, Decimal::ZERO),
        Value::String(s) => parse_percentage_str(s),
        _ => Decimal::ZERO,
    }
}

/// String form of [`parse_percentage_label`].
pub fn parse_percentage_str(label: &str) -> Decimal {
    PERCENT_IN_LABEL
        .find(label)
        .and_then(|m| Decimal::from_str(m.as_str()).ok())
        .unwrap_or(Decimal::ZERO)
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Decimal::from_u64(u);
    }
    // serde_json prints floats in shortest round-trip form, so 0.1 stays 0.1
    // instead of 0.1000000000000000055511151231257827.
    parse_decimal(&n.to_string())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if let Ok(d) = Decimal::from_str(unsigned) {
        return Some(d);
    }

    if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok().and_then(Decimal::from_u64);
    }

    // Scientific notation and forms like ".5" or "5."; rejects inf and NaN.
    let float: f64 = unsigned.parse().ok()?;
    if !float.is_finite() {
        return None;
    }
    Decimal::from_str(&float.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(float))
}

// =============================================================================
// Unit Tests
// =============================================================================
