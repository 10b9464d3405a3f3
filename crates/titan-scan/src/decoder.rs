//! # Frame Decoder
//!
//! Pulls the crop window out of a raw frame and looks for a barcode in it.
//!
//! ## Per-Tick Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  raw frame (W × H, RGBA)                                                │
//! │       │                                                                 │
//! │       │  extract(region)        copy only the crop window               │
//! │       ▼                                                                 │
//! │  crop buffer (w × h, RGBA) ─────────────────► live preview             │
//! │       │                                                                 │
//! │       │  spawn_blocking (holds the DecodeGate while it runs)            │
//! │       ▼                                                                 │
//! │  gate closed? ──► None (capture stopped)                                │
//! │       │                                                                 │
//! │  greyscale ──► BarcodeDecoder::decode                                   │
//! │                    │                                                    │
//! │                    ├── Ok(code)        → Some(code)                     │
//! │                    ├── NotFound        → None (silent)                  │
//! │                    └── Failed(reason)  → None (warn!)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in here is fatal. A decode that panics on the blocking pool is
//! reported as a miss like any other fault.
//!
//! ## Decoders
//! - [`MultiFormatDecoder`] (default): EAN-13/8, UPC-A/E, Code 128/39/93,
//!   ITF, Codabar, QR, Data Matrix, Aztec, PDF417
//! - [`QrDecoder`]: QR only, lighter

use std::sync::{Arc, PoisonError, RwLock};

use image::{imageops, GrayImage, RgbaImage};
use thiserror::Error;
use tracing::{trace, warn};

use titan_core::CropRegion;

// =============================================================================
// Decoder Trait
// =============================================================================

/// Why a buffer produced no code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// No symbol in the buffer. The normal outcome for most ticks.
    #[error("no barcode found")]
    NotFound,

    /// A symbol was located but could not be read, or the decoder broke.
    #[error("decode failed: {0}")]
    Failed(String),
}

/// A synchronous barcode decoder working on greyscale pixels.
///
/// Implementations are CPU bound and are always called from tokio's
/// blocking pool.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &GrayImage) -> Result<String, DecodeError>;
}

// =============================================================================
// Multi-Format Decoder
// =============================================================================

/// Decoder for every symbology `rxing` reads, retail 1D labels included.
///
/// Product labels at a till are mostly EAN-13 and UPC-A, with Code 128 on
/// shelf and warehouse labels and QR on newer packaging.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFormatDecoder;

impl BarcodeDecoder for MultiFormatDecoder {
    fn decode(&self, image: &GrayImage) -> Result<String, DecodeError> {
        let (width, height) = image.dimensions();

        match rxing::helpers::detect_in_luma(image.as_raw().clone(), width, height, None) {
            Ok(result) => Ok(result.getText().to_string()),
            Err(rxing::Exceptions::NotFoundException(_)) => Err(DecodeError::NotFound),
            Err(e) => Err(DecodeError::Failed(format!("{:?}", e))),
        }
    }
}

// =============================================================================
// QR Decoder
// =============================================================================

/// QR code decoder built on `rqrr`.
///
/// Every grid found in the buffer is tried in detection order; the first one
/// that decodes wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, image: &GrayImage) -> Result<String, DecodeError> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            image.get_pixel(x as u32, y as u32).0[0]
        });

        let grids = prepared.detect_grids();
        if grids.is_empty() {
            return Err(DecodeError::NotFound);
        }

        let mut last_error = None;
        for grid in grids {
            match grid.decode() {
                Ok((_, content)) => return Ok(content),
                Err(e) => last_error = Some(format!("{:?}", e)),
            }
        }

        Err(DecodeError::Failed(
            last_error.unwrap_or_else(|| "unreadable grid".to_string()),
        ))
    }
}

// =============================================================================
// Decode Gate
// =============================================================================

/// Switch that shuts off decoding for one capture run.
///
/// A decode holds the gate shared for as long as the decoder runs. `close`
/// takes it exclusively, so once `close` returns no decode is running and
/// none will enter the decoder again, including ones already queued on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct DecodeGate {
    open: Arc<RwLock<bool>>,
}

impl DecodeGate {
    pub fn new() -> Self {
        DecodeGate {
            open: Arc::new(RwLock::new(true)),
        }
    }

    /// Closes the gate, waiting out a decode that is already running.
    pub fn close(&self) {
        *self.open.write().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DecodeGate {
    fn default() -> Self {
        DecodeGate::new()
    }
}

// =============================================================================
// Frame Decoder
// =============================================================================

/// Crops frames and runs the barcode decoder off the async threads.
#[derive(Clone)]
pub struct FrameDecoder {
    decoder: Arc<dyn BarcodeDecoder>,
}

impl FrameDecoder {
    pub fn new(decoder: Arc<dyn BarcodeDecoder>) -> Self {
        FrameDecoder { decoder }
    }

    /// Copies `region` out of `frame` into a buffer exactly the region's size.
    ///
    /// The region must fit inside the frame; `compute` guarantees that.
    pub fn extract(frame: &RgbaImage, region: CropRegion) -> RgbaImage {
        imageops::crop_imm(frame, region.x, region.y, region.width, region.height).to_image()
    }

    /// Decodes a cropped buffer unless `gate` has been closed.
    ///
    /// Returns `None` on a miss or a closed gate. Decoder faults are logged
    /// and also returned as `None`.
    pub async fn decode(&self, crop: Arc<RgbaImage>, gate: &DecodeGate) -> Option<String> {
        let decoder = Arc::clone(&self.decoder);
        let gate = gate.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let open = gate.open.read().unwrap_or_else(PoisonError::into_inner);
            if !*open {
                return None;
            }
            let grey = imageops::grayscale(&*crop);
            Some(decoder.decode(&grey))
        })
        .await;

        match outcome {
            Ok(Some(Ok(code))) => Some(code),
            Ok(Some(Err(DecodeError::NotFound))) => None,
            Ok(Some(Err(DecodeError::Failed(reason)))) => {
                warn!(%reason, "Barcode decoder fault, treating as miss");
                None
            }
            Ok(None) => {
                trace!("Decode gate closed, skipping decode");
                None
            }
            Err(join_error) => {
                warn!(error = %join_error, "Decode task did not complete");
                None
            }
        }
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder").finish_non_exhaustive()
    }
}
