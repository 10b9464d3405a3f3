//! # titan-scan: Camera Product Scanner for Titan POS
//!
//! This crate turns a camera into a product scanner for the order builder.
//! It owns everything with I/O or timing; the pure rules live in
//! `titan-core`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Session Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     ScanSession (per dialog)                     │  │
//! │  │                                                                  │  │
//! │  │  Idle → Active → Closed, staged line, host operations           │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  │ start/stop                   │ DecodedCode{seq}     │
//! │                  ▼                              │                      │
//! │  ┌────────────────────────────┐   ┌─────────────┴──────────────────┐  │
//! │  │ CaptureManager             │   │ Router task                    │  │
//! │  │                            │   │                                │  │
//! │  │ CameraDevice → stream      │   │ stale/repeat guard             │  │
//! │  │ interval tick loop         │──►│ CatalogSource::snapshot()      │  │
//! │  │ crop → FrameDecoder        │   │ titan_core::resolve()          │  │
//! │  └────────────────────────────┘   └────────────────────────────────┘  │
//! │                                                                         │
//! │  EVENTS (to host via ScanEventSink):                                   │
//! │  • on_notice: started / matched / not found / camera unavailable /     │
//! │    closed                                                              │
//! │  • on_product_scanned: one ScannedLine per confirmed add              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`session`] - `ScanSession` state machine and host operations
//! - [`capture`] - Camera ownership and the capture tick loop
//! - [`decoder`] - Crop extraction and barcode decoding
//! - [`camera`] - Camera traits and the still-image replay camera
//! - [`catalog`] - Catalog sources the session resolves against
//! - [`config`] - Scanner configuration (TOML + environment)
//! - [`error`] - Scan error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use titan_scan::{ScanConfig, ScanSession, SharedCatalog};
//!
//! let config = ScanConfig::load_or_default(None);
//! let catalog = Arc::new(SharedCatalog::new(snapshot));
//!
//! let mut session = ScanSession::builder(config)
//!     .with_camera(camera)
//!     .with_catalog(catalog.clone())
//!     .with_sink(sink)
//!     .build()?;
//!
//! session.start().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod camera;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod decoder;
pub mod error;
pub mod session;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use camera::{CameraDevice, CameraStream, ReplayCamera, StreamRequest, VideoFrame};
pub use capture::{CaptureManager, CropPreview, DecodedCode, PreviewReceiver};
pub use catalog::{load_catalog_file, CatalogSource, SharedCatalog};
pub use config::{CaptureSettings, FacingMode, OrderSettings, ScanConfig};
pub use decoder::{BarcodeDecoder, DecodeError, DecodeGate, FrameDecoder, MultiFormatDecoder, QrDecoder};
pub use error::{CameraError, ScanError, ScanResult};
pub use session::{
    NoOpSink, ScanEventSink, ScanNotice, ScanSession, ScanSessionBuilder, SessionState, SessionView,
};
