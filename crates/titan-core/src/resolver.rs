//! # Product Resolver
//!
//! Maps a scanned code to a (product, variant) pair.
//!
//! ## Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  code "A1"                                                              │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  1. any variant.sku == code ?  ──── yes ──► (product, variant)  [Sku]   │
//! │     │ no                                                                │
//! │     ▼                                                                   │
//! │  2. any variant.id  == code ?  ──── yes ──► (product, variant)  [VarId] │
//! │     │ no                                                                │
//! │     ▼                                                                   │
//! │  3. any product.id  == code ?  ──── yes ──► (product, only variant      │
//! │     │ no                                     or None if ambiguous)      │
//! │     ▼                                                                   │
//! │  None → "product not found", scanning continues                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tier scans the whole catalog before the next tier starts, so a SKU
//! match on the last product beats a variant-ID match on the first one.
//! Within a tier the first hit in catalog order wins.

use crate::types::{MatchTier, Product, ProductVariant, ScanMatch};

/// Resolves `code` against the catalog.
pub fn resolve(code: &str, catalog: &[Product]) -> Option<ScanMatch> {
    if code.is_empty() {
        return None;
    }

    if let Some((product, variant)) = find_variant(catalog, |v| v.has_sku(code)) {
        return Some(variant_match(product, variant, MatchTier::Sku));
    }

    if let Some((product, variant)) = find_variant(catalog, |v| v.id == code) {
        return Some(variant_match(product, variant, MatchTier::VariantId));
    }

    catalog.iter().find(|p| p.id == code).map(|product| {
        // Only an unambiguous product preselects its variant
        let variant = match product.variants.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        ScanMatch {
            product: product.clone(),
            variant,
            tier: MatchTier::ProductId,
        }
    })
}

fn find_variant<'a, F>(catalog: &'a [Product], mut pred: F) -> Option<(&'a Product, &'a ProductVariant)>
where
    F: FnMut(&ProductVariant) -> bool,
{
    catalog
        .iter()
        .find_map(|p| p.variants.iter().find(|&v| pred(v)).map(|v| (p, v)))
}

fn variant_match(product: &Product, variant: &ProductVariant, tier: MatchTier) -> ScanMatch {
    ScanMatch {
        product: product.clone(),
        variant: Some(variant.clone()),
        tier,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
