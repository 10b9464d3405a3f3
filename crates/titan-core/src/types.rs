//! # Domain Types
//!
//! Catalog and order-line types used by the scan-to-product pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ CatalogSnapshot │   │    Product      │   │ ProductVariant  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  products[] ────┼──►│  id             │   │  id             │       │
//! │  │  (read only)    │   │  title          │   │  sku (optional) │       │
//! │  └─────────────────┘   │  variants[] ────┼──►│  prices[]       │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ScanMatch     │   │  PendingLine    │   │  ScannedLine    │       │
//! │  │  ─────────────  │──►│  ─────────────  │──►│  ─────────────  │       │
//! │  │  product        │   │  product        │   │  product        │       │
//! │  │  variant?       │   │  variant?       │   │  variant        │       │
//! │  │  tier           │   │  quantity ≥ 1   │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   │  unit_price?    │       │
//! │     resolver output      staged in session   └─────────────────┘       │
//! │                                                 emitted to host         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `ScanMatch` clones the product and variant out of the catalog snapshot,
//! so a staged line keeps displaying consistent data even if the host swaps
//! in a newer catalog while the operator is choosing a quantity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::validation::{clamp_quantity, coerce_quantity};
use crate::DEFAULT_LINE_QUANTITY;

// =============================================================================
// Variant Price
// =============================================================================

/// A price for one currency, in the currency's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantPrice {
    /// ISO 4217 code, e.g. "usd" or "EUR" (compared case-insensitively).
    pub currency_code: String,

    /// Amount in minor units (cents for USD).
    pub amount: i64,
}

// =============================================================================
// Product Variant
// =============================================================================

/// A purchasable configuration of a product (size, color, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductVariant {
    /// Variant identifier assigned by the commerce backend.
    pub id: String,

    /// Display title, e.g. "Large / Blue".
    #[serde(default)]
    pub title: String,

    /// Stock Keeping Unit. Not every variant has one.
    #[serde(default)]
    pub sku: Option<String>,

    /// Prices, one per currency.
    #[serde(default)]
    pub prices: Vec<VariantPrice>,
}

impl ProductVariant {
    /// Returns the price in `currency_code`, if the variant has one.
    pub fn price_for(&self, currency_code: &str) -> Option<i64> {
        self.prices
            .iter()
            .find(|p| p.currency_code.eq_ignore_ascii_case(currency_code))
            .map(|p| p.amount)
    }

    /// True if this variant's SKU is exactly `code`.
    #[inline]
    pub fn has_sku(&self, code: &str) -> bool {
        self.sku.as_deref() == Some(code)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Product identifier assigned by the commerce backend.
    pub id: String,

    /// Display name shown in the matched-product panel.
    pub title: String,

    /// Optional thumbnail URL for the matched-product panel.
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Variants in catalog order.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Finds a variant of this product by ID.
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// True when the operator has to pick a variant.
    #[inline]
    pub fn has_multiple_variants(&self) -> bool {
        self.variants.len() > 1
    }
}

// =============================================================================
// Catalog Snapshot
// =============================================================================

/// The host's product list as of the last fetch.
///
/// The scanner only ever reads it. Iteration order is the catalog order and
/// decides ties during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn new(products: Vec<Product>) -> Self {
        CatalogSnapshot { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl From<Vec<Product>> for CatalogSnapshot {
    fn from(products: Vec<Product>) -> Self {
        CatalogSnapshot::new(products)
    }
}

// =============================================================================
// Scan Match
// =============================================================================

/// Which catalog field a code matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// A variant's SKU.
    Sku,
    /// A variant's ID.
    VariantId,
    /// A product's ID.
    ProductId,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Sku => write!(f, "sku"),
            MatchTier::VariantId => write!(f, "variant_id"),
            MatchTier::ProductId => write!(f, "product_id"),
        }
    }
}

/// Result of resolving a code against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanMatch {
    pub product: Product,

    /// `None` only for a product-ID match on a multi-variant product.
    pub variant: Option<ProductVariant>,

    pub tier: MatchTier,
}

// =============================================================================
// Pending Line
// =============================================================================

/// A matched product waiting for the operator to confirm "add to order".
///
/// ## Lifecycle
/// ```text
/// ScanMatch ──► PendingLine::from_match() ──► set_quantity / select_variant
///                                                   │
///                       ┌───────────────────────────┴──────────┐
///                       ▼                                      ▼
///              to_scanned() → host                 discarded on reset/close
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PendingLine {
    pub product: Product,
    pub variant: Option<ProductVariant>,
    pub quantity: u32,
    pub tier: MatchTier,
}

impl PendingLine {
    /// Stages a match with the default quantity.
    pub fn from_match(scan: ScanMatch) -> Self {
        PendingLine {
            product: scan.product,
            variant: scan.variant,
            quantity: DEFAULT_LINE_QUANTITY,
            tier: scan.tier,
        }
    }

    /// True while the variant selector has to be shown and nothing is chosen.
    pub fn needs_variant_choice(&self) -> bool {
        self.variant.is_none() && self.product.has_multiple_variants()
    }

    /// Selects one of the staged product's variants.
    pub fn select_variant(&mut self, variant_id: &str) -> CoreResult<()> {
        let variant = self.product.variant(variant_id).cloned().ok_or_else(|| {
            CoreError::VariantNotInProduct {
                product_id: self.product.id.clone(),
                variant_id: variant_id.to_string(),
            }
        })?;
        self.variant = Some(variant);
        Ok(())
    }

    /// Sets the quantity from raw input text. Returns the stored value.
    pub fn set_quantity(&mut self, raw: &str) -> u32 {
        self.quantity = coerce_quantity(raw);
        self.quantity
    }

    /// Sets the quantity from a number. Returns the stored value.
    pub fn set_quantity_value(&mut self, quantity: i64) -> u32 {
        self.quantity = clamp_quantity(quantity);
        self.quantity
    }

    /// The variant that will be emitted: the chosen one, else the first.
    pub fn effective_variant(&self) -> Option<&ProductVariant> {
        self.variant.as_ref().or_else(|| self.product.variants.first())
    }

    /// Builds the line handed to the host order workflow.
    pub fn to_scanned(&self, currency_code: &str, scanned_at: DateTime<Utc>) -> CoreResult<ScannedLine> {
        let variant = self
            .effective_variant()
            .cloned()
            .ok_or_else(|| CoreError::NoVariants {
                product_id: self.product.id.clone(),
            })?;

        Ok(ScannedLine {
            unit_price: variant.price_for(currency_code),
            currency_code: currency_code.to_string(),
            product: self.product.clone(),
            variant,
            quantity: self.quantity,
            scanned_at,
        })
    }
}

// =============================================================================
// Scanned Line
// =============================================================================

/// A confirmed scan, emitted exactly once to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScannedLine {
    pub product: Product,
    pub variant: ProductVariant,
    pub quantity: u32,

    /// Unit price in `currency_code`, if the variant is priced in it.
    pub unit_price: Option<i64>,

    pub currency_code: String,

    #[ts(as = "String")]
    pub scanned_at: DateTime<Utc>,
}

impl ScannedLine {
    /// Unit price × quantity, if priced.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.map(|p| p * i64::from(self.quantity))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, sku: Option<&str>, usd: i64) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            title: format!("Variant {}", id),
            sku: sku.map(str::to_string),
            prices: vec![VariantPrice {
                currency_code: "usd".to_string(),
                amount: usd,
            }],
        }
    }

    fn product(id: &str, variants: Vec<ProductVariant>) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {}", id),
            thumbnail: None,
            variants,
        }
    }

    #[test]
    fn test_price_for_is_case_insensitive() {
        let v = variant("v1", Some("SKU-1"), 1099);
        assert_eq!(v.price_for("USD"), Some(1099));
        assert_eq!(v.price_for("eur"), None);
    }

    #[test]
    fn test_pending_line_defaults() {
        let p = product("p1", vec![variant("v1", None, 500), variant("v2", None, 700)]);
        let line = PendingLine::from_match(ScanMatch {
            product: p,
            variant: None,
            tier: MatchTier::ProductId,
        });

        assert_eq!(line.quantity, 1);
        assert!(line.needs_variant_choice());
        // Falls back to the first variant when nothing was picked
        assert_eq!(line.effective_variant().map(|v| v.id.as_str()), Some("v1"));
    }

    #[test]
    fn test_select_variant_rejects_foreign_variant() {
        let p = product("p1", vec![variant("v1", None, 500), variant("v2", None, 700)]);
        let mut line = PendingLine::from_match(ScanMatch {
            product: p,
            variant: None,
            tier: MatchTier::ProductId,
        });

        assert!(line.select_variant("v9").is_err());
        assert!(line.variant.is_none());

        line.select_variant("v2").unwrap();
        assert!(!line.needs_variant_choice());
        assert_eq!(line.variant.as_ref().map(|v| v.id.as_str()), Some("v2"));
    }

    #[test]
    fn test_to_scanned_uses_selected_currency() {
        let p = product("p1", vec![variant("v1", Some("SKU-1"), 250)]);
        let mut line = PendingLine::from_match(ScanMatch {
            variant: Some(p.variants[0].clone()),
            product: p,
            tier: MatchTier::Sku,
        });
        line.set_quantity("4");

        let scanned = line.to_scanned("USD", Utc::now()).unwrap();
        assert_eq!(scanned.quantity, 4);
        assert_eq!(scanned.unit_price, Some(250));
        assert_eq!(scanned.line_total(), Some(1000));
        assert_eq!(scanned.variant.id, "v1");
    }

    #[test]
    fn test_to_scanned_without_variants_fails() {
        let line = PendingLine::from_match(ScanMatch {
            product: product("empty", vec![]),
            variant: None,
            tier: MatchTier::ProductId,
        });
        assert!(matches!(
            line.to_scanned("usd", Utc::now()),
            Err(CoreError::NoVariants { .. })
        ));
    }

    #[test]
    fn test_catalog_snapshot_deserializes_from_array() {
        let json = r#"[
            {"id": "p1", "title": "Cola", "variants": [
                {"id": "v1", "sku": "COLA-330", "prices": [{"currency_code": "usd", "amount": 199}]}
            ]}
        ]"#;
        let catalog: CatalogSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.products()[0].variants[0].has_sku("COLA-330"));
        assert_eq!(catalog.products()[0].variants[0].title, "");
    }

    #[test]
    fn test_match_tier_display() {
        assert_eq!(MatchTier::Sku.to_string(), "sku");
        assert_eq!(MatchTier::ProductId.to_string(), "product_id");
    }
}
