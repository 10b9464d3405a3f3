//! # Validation Module
//!
//! Input validation utilities for the scanner.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Scanner dialog (host UI)                                     │
//! │  ├── Numeric input for quantity                                        │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantity is coerced, never rejected (floor 1, cap 999)            │
//! │  └── Decoded codes are checked before hitting the resolver             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use titan_core::validation::{coerce_quantity, validate_code};
//!
//! assert_eq!(coerce_quantity("0"), 1);
//! assert_eq!(coerce_quantity("abc"), 1);
//! assert!(validate_code("COLA-330").is_ok());
//! ```

use crate::error::ValidationError;
use crate::{DEFAULT_LINE_QUANTITY, MAX_CODE_LENGTH, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity
// =============================================================================

/// Clamps a numeric quantity into `1..=MAX_LINE_QUANTITY`.
pub fn clamp_quantity(quantity: i64) -> u32 {
    if quantity < 1 {
        return DEFAULT_LINE_QUANTITY;
    }
    // Bounded by MAX_LINE_QUANTITY, so the cast cannot truncate
    quantity.min(i64::from(MAX_LINE_QUANTITY)) as u32
}

/// Coerces raw quantity input to a valid quantity.
///
/// ## Rules
/// - Non-numeric, empty, zero or negative input becomes 1
/// - Values above MAX_LINE_QUANTITY (999) are capped
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Matched product panel                                                  │
/// │                                                                         │
/// │  Operator clears the quantity field and types "0"                      │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  coerce_quantity("0") ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       └── 1 (field snaps back, "Add to order" stays enabled)           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn coerce_quantity(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(quantity) => clamp_quantity(quantity),
        Err(_) => DEFAULT_LINE_QUANTITY,
    }
}

/// Validates a quantity strictly (for APIs that must not coerce).
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if !(1..=i64::from(MAX_LINE_QUANTITY)).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::from(MAX_LINE_QUANTITY),
        });
    }

    Ok(())
}

// =============================================================================
// Codes
// =============================================================================

/// Validates a decoded or manually entered code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most MAX_CODE_LENGTH characters
/// - Must not contain control characters
///
/// The code itself is never trimmed or normalised: resolution is an exact
/// comparison.
pub fn validate_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LENGTH,
        });
    }

    if code.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_quantity_floor() {
        assert_eq!(coerce_quantity("0"), 1);
        assert_eq!(coerce_quantity("-5"), 1);
        assert_eq!(coerce_quantity(""), 1);
        assert_eq!(coerce_quantity("abc"), 1);
        assert_eq!(coerce_quantity("2.5"), 1);
    }

    #[test]
    fn test_coerce_quantity_accepts_numbers() {
        assert_eq!(coerce_quantity("1"), 1);
        assert_eq!(coerce_quantity(" 12 "), 12);
        assert_eq!(coerce_quantity("999"), 999);
        assert_eq!(coerce_quantity("1500"), 999);
        assert_eq!(coerce_quantity("100000"), 999);
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(0), 1);
        assert_eq!(clamp_quantity(i64::MIN), 1);
        assert_eq!(clamp_quantity(7), 7);
        assert_eq!(clamp_quantity(i64::MAX), 999);
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("4006381333931").is_ok());
        assert!(validate_code("VARIANT-SKU-7").is_ok());
        assert!(validate_code(" padded ").is_ok());

        assert!(validate_code("").is_err());
        assert!(validate_code("line\nbreak").is_err());
        assert!(validate_code(&"9".repeat(MAX_CODE_LENGTH + 1)).is_err());
    }
}
