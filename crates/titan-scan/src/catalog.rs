//! # Catalog Sources
//!
//! Where the session reads products from when it resolves a code.
//!
//! The host owns the catalog and may refetch it at any time. The session
//! asks for a snapshot on every resolve, so a refetched catalog is picked up
//! by the next scan without restarting the session.
//!
//! ```text
//!   host refetch ──► SharedCatalog::replace(snapshot)
//!                           │  watch channel
//!                           ▼
//!   router task ──► CatalogSource::snapshot() ──► Arc<CatalogSnapshot>
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use titan_core::CatalogSnapshot;

use crate::error::{ScanError, ScanResult};

/// Read-only access to the host's current product catalog.
pub trait CatalogSource: Send + Sync {
    /// The latest catalog. Cheap; returns a shared handle.
    fn snapshot(&self) -> Arc<CatalogSnapshot>;
}

// =============================================================================
// Shared Catalog
// =============================================================================

/// A catalog the host can swap while sessions keep reading it.
#[derive(Debug)]
pub struct SharedCatalog {
    tx: watch::Sender<Arc<CatalogSnapshot>>,
}

impl SharedCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        SharedCatalog { tx }
    }

    /// Publishes a newly fetched catalog.
    pub fn replace(&self, snapshot: CatalogSnapshot) {
        debug!(products = snapshot.len(), "Catalog replaced");
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// Receiver that is notified whenever the catalog is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CatalogSnapshot>> {
        self.tx.subscribe()
    }
}

impl Default for SharedCatalog {
    fn default() -> Self {
        SharedCatalog::new(CatalogSnapshot::default())
    }
}

impl CatalogSource for SharedCatalog {
    fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.tx.borrow())
    }
}

/// Reads a catalog from a JSON array of products.
pub fn load_catalog_file(path: &Path) -> ScanResult<CatalogSnapshot> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ScanError::CatalogLoadFailed(format!("{}: {}", path.display(), e)))?;
    let snapshot: CatalogSnapshot = serde_json::from_str(&contents)?;
    info!(?path, products = snapshot.len(), "Catalog loaded");
    Ok(snapshot)
}
