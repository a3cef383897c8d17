//! # Error Types
//!
//! Error types for tally-core.
//!
//! ## Where Errors Can Occur
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Surface                                   │
//! │                                                                         │
//! │  Calculators (line, totals)        → NEVER fail, no Result             │
//! │  Coercion (to_number, labels)      → NEVER fail, fall back to default  │
//! │  Normalization (raw records)       → NEVER fail, warn + default        │
//! │                                                                         │
//! │  Strict label parsing (FromStr)    → CoreError::Unknown*               │
//! │  Snapshot JSON helpers             → CoreError::Serialization          │
//! │                                                                         │
//! │  Flow: CoreError → SyncError → anyhow (CLI)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the offending input in the message
//! 3. Errors are enum variants, never String

use thiserror::Error;

/// Errors raised at the edges of the engine.
///
/// The calculators themselves have no error type; these only come from
/// strict parsing that a caller explicitly asked for.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tax treatment label was neither TDS nor TCS.
    #[error("Unknown tax treatment: '{0}'. Valid options: TDS, TCS")]
    UnknownTaxTreatment(String),

    /// Rounding mode label did not match any known mode.
    #[error("Unknown rounding mode: '{0}'. Valid options: none, nearest, floor, ceil")]
    UnknownRoundingMode(String),

    /// Document kind label did not match any known kind.
    #[error("Unknown document kind: '{0}'")]
    UnknownDocumentKind(String),

    /// Snapshot could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownTaxTreatment("VAT".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown tax treatment: 'VAT'. Valid options: TDS, TCS"
        );

        let err = CoreError::UnknownDocumentKind("memo".to_string());
        assert_eq!(err.to_string(), "Unknown document kind: 'memo'");
    }

    #[test]
    fn test_serde_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
