//! # titan-core: Pure Scan Logic for Titan POS
//!
//! This crate is the **heart** of the Titan POS scanner. It contains all
//! scan-to-product logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Titan POS Scanner Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Scanner Dialog (host UI)                     │   │
//! │  │   Video ──► Crop overlay ──► Matched panel ──► Add to order    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                titan-scan (ScanSession, capture loop)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ titan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ geometry  │  │ resolver  │  │ validation│  │   │
//! │  │   │  Product  │  │CropPolicy │  │ SKU → ID  │  │ quantity  │  │   │
//! │  │   │PendingLine│  │CropRegion │  │ → product │  │  codes    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CAMERA • NO TIMERS • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and line types (Product, ProductVariant, PendingLine, etc.)
//! - [`geometry`] - Crop window calculation for camera frames
//! - [`resolver`] - Code → (product, variant) resolution with fixed precedence
//! - [`error`] - Domain error types
//! - [`validation`] - Quantity coercion and input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use titan_core::geometry::compute_crop;
//!
//! let region = compute_crop(1280, 720).unwrap();
//! assert_eq!((region.x, region.y, region.width, region.height), (340, 160, 600, 400));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod geometry;
pub mod resolver;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use geometry::{compute_crop, CropPolicy, CropRegion, OverlayGuide};
pub use resolver::resolve;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Quantity a freshly staged line starts with.
pub const DEFAULT_LINE_QUANTITY: u32 = 1;

/// Maximum quantity of a single scanned line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Longest code the resolver will look at.
///
/// Real symbologies stay far below this; anything longer is decoder noise.
pub const MAX_CODE_LENGTH: usize = 256;
