//! # Error Types
//!
//! Domain-specific error types for titan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  titan-core errors (this file)                                         │
//! │  ├── CoreError        - Staged line / catalog rule violations          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  titan-scan errors (separate crate)                                    │
//! │  └── ScanError        - Camera, session and config failures            │
//! │                                                                         │
//! │  Flow: CoreError → ScanError → host notification                       │
//! │        ValidationError → "not found" / config rejection                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product ID, variant ID)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core scanning logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A variant was selected that does not belong to the staged product.
    #[error("Variant {variant_id} does not belong to product {product_id}")]
    VariantNotInProduct {
        product_id: String,
        variant_id: String,
    },

    /// The staged product has no variants, so no line can be built.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan "PROD-1" (product ID match)
    ///      │
    ///      ▼
    /// Product has 0 variants
    ///      │
    ///      ▼
    /// Confirm add → NoVariants { product_id: "PROD-1" }
    ///      │
    ///      ▼
    /// UI shows: "Product PROD-1 has no purchasable variants"
    /// ```
    #[error("Product {product_id} has no purchasable variants")]
    NoVariants { product_id: String },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., not a number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
