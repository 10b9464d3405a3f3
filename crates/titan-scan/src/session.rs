//! # Scan Session
//!
//! The state machine behind one opening of the scanner dialog.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │        start() fails                                                    │
//! │        (error kept, retry ok)                                           │
//! │          ┌─────┐                                                        │
//! │          ▼     │                                                        │
//! │       ┌──────┐ │  start()   ┌────────┐   stop() / close()  ┌────────┐  │
//! │  ───► │ Idle │─┴──────────► │ Active │ ──────────────────► │ Closed │  │
//! │       └──────┘              └───┬────┘                     └────────┘  │
//! │          │                      │  ▲                         terminal   │
//! │          │ close()              │  │ decode → resolve                   │
//! │          └──────────────────────┼──┼───────────────────────────►        │
//! │                                 ▼  │                                    │
//! │                       staged PendingLine (data, not a state)            │
//! │                       confirm_add() emits it exactly once               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//!   CaptureManager ──DecodedCode{seq}──► router task ──► SessionInner
//!                                                            │ (write lock)
//!                    CatalogSource::snapshot() ──────────────┤
//!                                                            ▼
//!                                             resolve() → PendingLine
//!                                                            │
//!                                         ScanEventSink ◄────┘ notices
//! ```
//!
//! Capture keeps running while a line is staged. A different code replaces
//! the staged line; the same code seen again on later ticks is ignored so
//! the operator's quantity edits survive. A code that missed is resolved
//! again once the host has replaced the catalog.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use titan_core::validation::validate_code;
use titan_core::{resolve, CatalogSnapshot, MatchTier, PendingLine, ScannedLine};

use crate::camera::{CameraDevice, StreamRequest};
use crate::capture::{CaptureManager, DecodedCode, PreviewReceiver};
use crate::catalog::CatalogSource;
use crate::config::ScanConfig;
use crate::decoder::{BarcodeDecoder, FrameDecoder, MultiFormatDecoder};
use crate::error::{ScanError, ScanResult};

/// Decoded codes buffered between the tick loop and the router.
const CODE_CHANNEL_CAPACITY: usize = 16;

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, camera not acquired (or acquisition failed).
    Idle,

    /// Camera running, codes are being resolved.
    Active,

    /// Torn down. Open a new session to scan again.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Active => write!(f, "active"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Transient notifications for the host (toasts, status line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanNotice {
    /// The camera is live and scanning.
    Started,

    /// A code resolved and its product is staged.
    Matched {
        code: String,
        product_id: String,
        variant_id: Option<String>,
        tier: MatchTier,
    },

    /// A code was read but nothing in the catalog carries it.
    ProductNotFound { code: String },

    /// The camera could not be acquired. Retryable.
    CameraUnavailable { message: String },

    /// The session was torn down.
    Closed,
}

/// Receives session events.
///
/// Called from the router task and from host-facing methods, never while
/// the session lock is held.
pub trait ScanEventSink: Send + Sync {
    /// Transient notification.
    fn on_notice(&self, notice: &ScanNotice);

    /// A confirmed line for the host's order. Called once per confirm.
    fn on_product_scanned(&self, line: &ScannedLine);
}

/// Sink that ignores everything.
pub struct NoOpSink;

impl ScanEventSink for NoOpSink {
    fn on_notice(&self, _notice: &ScanNotice) {}
    fn on_product_scanned(&self, _line: &ScannedLine) {}
}

// =============================================================================
// Session View
// =============================================================================

/// Read-only snapshot of everything the scanner dialog renders.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: SessionState,

    /// Last code read (by camera or manual entry).
    pub last_code: Option<String>,

    /// Staged line awaiting "add to order".
    pub pending: Option<PendingLine>,

    /// True while the variant selector must be shown.
    pub needs_variant_choice: bool,

    /// Last camera error, shown until the next successful start.
    pub last_error: Option<String>,
}

// =============================================================================
// Session Inner State
// =============================================================================

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    last_code: Option<String>,
    pending: Option<PendingLine>,
    last_error: Option<String>,

    /// Highest tick sequence applied during the current capture run.
    last_seq: u64,

    /// Catalog `last_code` missed in. `None` when it matched.
    missed_in: Option<Arc<CatalogSnapshot>>,
}

impl SessionInner {
    fn new() -> Self {
        SessionInner {
            state: SessionState::Idle,
            last_code: None,
            pending: None,
            last_error: None,
            last_seq: 0,
            missed_in: None,
        }
    }

    /// Applies a camera-decoded code. Returns the notice to emit, if any.
    fn accept_decoded(
        &mut self,
        decoded: &DecodedCode,
        catalog: &Arc<CatalogSnapshot>,
        default_quantity: u32,
    ) -> Option<ScanNotice> {
        if self.state != SessionState::Active {
            return None;
        }
        if decoded.seq <= self.last_seq {
            debug!(seq = decoded.seq, last_seq = self.last_seq, "Dropping stale decode");
            return None;
        }
        self.last_seq = decoded.seq;

        if self.last_code.as_deref() == Some(decoded.text.as_str()) {
            let refetched = self
                .missed_in
                .as_ref()
                .is_some_and(|seen| !Arc::ptr_eq(seen, catalog));
            if !refetched {
                trace!(code = %decoded.text, "Same code still in view");
                return None;
            }
            debug!(code = %decoded.text, "Catalog replaced since the miss, resolving again");
        }

        Some(self.apply_code(&decoded.text, catalog, default_quantity))
    }

    /// Resolves `code` and stages the match. Misses leave any staged line alone.
    fn apply_code(&mut self, code: &str, catalog: &Arc<CatalogSnapshot>, default_quantity: u32) -> ScanNotice {
        self.last_code = Some(code.to_string());

        let found = match validate_code(code) {
            Ok(()) => resolve(code, catalog.products()),
            Err(e) => {
                debug!(error = %e, "Rejected malformed code");
                None
            }
        };

        let Some(scan) = found else {
            self.missed_in = Some(Arc::clone(catalog));
            return ScanNotice::ProductNotFound {
                code: code.to_string(),
            };
        };

        let notice = ScanNotice::Matched {
            code: code.to_string(),
            product_id: scan.product.id.clone(),
            variant_id: scan.variant.as_ref().map(|v| v.id.clone()),
            tier: scan.tier,
        };

        let mut pending = PendingLine::from_match(scan);
        pending.set_quantity_value(i64::from(default_quantity));
        self.pending = Some(pending);
        self.missed_in = None;

        notice
    }

    /// Drops everything tied to the camera run and the staged line.
    fn reset(&mut self) {
        self.last_code = None;
        self.pending = None;
        self.last_error = None;
        self.last_seq = 0;
        self.missed_in = None;
    }

    fn view(&self, session_id: Uuid) -> SessionView {
        SessionView {
            session_id,
            state: self.state,
            last_code: self.last_code.clone(),
            needs_variant_choice: self
                .pending
                .as_ref()
                .map(PendingLine::needs_variant_choice)
                .unwrap_or(false),
            pending: self.pending.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

// =============================================================================
// Scan Session
// =============================================================================

/// One scanner dialog's worth of scanning.
///
/// ## Usage
/// ```rust,ignore
/// let mut session = ScanSession::builder(config)
///     .with_camera(camera)
///     .with_catalog(catalog)
///     .with_sink(sink)
///     .build()?;
///
/// session.start().await?;
/// // ... sink receives Matched, UI calls set_quantity / select_variant ...
/// let line = session.confirm_add().await?;
/// session.close().await;
/// ```
pub struct ScanSession {
    id: Uuid,
    config: Arc<ScanConfig>,
    catalog: Arc<dyn CatalogSource>,
    sink: Arc<dyn ScanEventSink>,
    state: Arc<RwLock<SessionInner>>,
    capture: CaptureManager,

    /// Router task (set while Active).
    router: Option<JoinHandle<()>>,
}

impl ScanSession {
    pub fn builder(config: ScanConfig) -> ScanSessionBuilder {
        ScanSessionBuilder::new(config)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot for the UI.
    pub async fn view(&self) -> SessionView {
        self.state.read().await.view(self.id)
    }

    /// Receiver for the live crop preview.
    pub fn subscribe_preview(&self) -> PreviewReceiver {
        self.capture.subscribe_preview()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Acquires the camera and starts scanning.
    ///
    /// On camera failure the session stays Idle, the error is kept for the
    /// view and a `CameraUnavailable` notice is sent; calling `start` again
    /// retries. A no-op while Active.
    pub async fn start(&mut self) -> ScanResult<()> {
        match self.state.read().await.state {
            SessionState::Closed => return Err(ScanError::SessionClosed),
            SessionState::Active => return Ok(()),
            SessionState::Idle => {}
        }

        let (codes_tx, codes_rx) = mpsc::channel(CODE_CHANNEL_CAPACITY);

        if let Err(e) = self.capture.start(codes_tx).await {
            warn!(session_id = %self.id, error = %e, "Camera unavailable");
            let message = e.to_string();
            self.state.write().await.last_error = Some(message.clone());
            self.sink.on_notice(&ScanNotice::CameraUnavailable { message });
            return Err(e.into());
        }

        {
            let mut inner = self.state.write().await;
            inner.state = SessionState::Active;
            inner.last_error = None;
            inner.last_seq = 0;
        }

        self.router = Some(tokio::spawn(code_router(
            self.id,
            Arc::clone(&self.state),
            Arc::clone(&self.catalog),
            Arc::clone(&self.sink),
            self.config.order.default_quantity,
            codes_rx,
        )));

        info!(session_id = %self.id, "Scan session started");
        self.sink.on_notice(&ScanNotice::Started);
        Ok(())
    }

    /// Stops scanning and closes the session.
    ///
    /// Releases the camera, cancels the timer and clears the staged line,
    /// last code and error. Safe from any state; never fails.
    ///
    /// The session leaves Active before capture stops, so a code decoded
    /// during teardown never stages a line.
    pub async fn stop(&mut self) {
        let previous = {
            let mut inner = self.state.write().await;
            std::mem::replace(&mut inner.state, SessionState::Closed)
        };

        self.capture.stop();
        if let Some(router) = self.router.take() {
            router.abort();
            // Join so the router cannot notify the sink after Closed
            let _ = router.await;
        }

        self.state.write().await.reset();

        if previous != SessionState::Closed {
            info!(session_id = %self.id, from = %previous, "Scan session closed");
            self.sink.on_notice(&ScanNotice::Closed);
        }
    }

    /// The host dialog was closed. Same teardown as [`stop`](Self::stop),
    /// whether or not scanning ever started.
    pub async fn close(&mut self) {
        self.stop().await;
    }

    // =========================================================================
    // Host Operations
    // =========================================================================

    /// Sets the staged quantity from raw input. Returns the stored value.
    ///
    /// Empty, non-numeric, zero and negative input all become 1.
    pub async fn set_quantity(&self, raw: &str) -> ScanResult<u32> {
        let mut inner = self.state.write().await;
        Ok(staged(&mut inner)?.set_quantity(raw))
    }

    /// Sets the staged quantity from a number, clamped to the valid range.
    pub async fn set_quantity_value(&self, quantity: i64) -> ScanResult<u32> {
        let mut inner = self.state.write().await;
        Ok(staged(&mut inner)?.set_quantity_value(quantity))
    }

    /// Chooses a variant of the staged product.
    pub async fn select_variant(&self, variant_id: &str) -> ScanResult<()> {
        let mut inner = self.state.write().await;
        staged(&mut inner)?.select_variant(variant_id)?;
        debug!(session_id = %self.id, variant_id, "Variant selected");
        Ok(())
    }

    /// Emits the staged line to the host and clears it.
    ///
    /// Without an explicit variant choice the product's first variant is
    /// used. The sink sees each staged line at most once.
    pub async fn confirm_add(&self) -> ScanResult<ScannedLine> {
        let line = {
            let mut inner = self.state.write().await;
            let pending = staged(&mut inner)?;
            if pending.needs_variant_choice() {
                debug!(session_id = %self.id, "No variant chosen, using the first");
            }
            let line = pending.to_scanned(&self.config.order.currency_code, Utc::now())?;
            inner.pending = None;
            inner.last_code = None;
            inner.missed_in = None;
            line
        };

        info!(
            session_id = %self.id,
            product_id = %line.product.id,
            variant_id = %line.variant.id,
            quantity = line.quantity,
            "Scanned product added"
        );
        self.sink.on_product_scanned(&line);
        Ok(line)
    }

    /// Feeds a manually typed or keyboard-wedge code through the resolver.
    ///
    /// Works with or without the camera; only a closed session refuses.
    pub async fn submit_code(&self, code: &str) -> ScanResult<ScanNotice> {
        let notice = {
            let mut inner = self.state.write().await;
            if inner.state == SessionState::Closed {
                return Err(ScanError::SessionClosed);
            }
            let catalog = self.catalog.snapshot();
            inner.apply_code(code, &catalog, self.config.order.default_quantity)
        };

        self.sink.on_notice(&notice);
        Ok(notice)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(router) = self.router.take() {
            router.abort();
        }
    }
}

/// The staged line, or why there is none.
fn staged(inner: &mut SessionInner) -> ScanResult<&mut PendingLine> {
    if inner.state == SessionState::Closed {
        return Err(ScanError::SessionClosed);
    }
    inner.pending.as_mut().ok_or(ScanError::NothingStaged)
}

/// Applies decoded codes to the session in tick order.
async fn code_router(
    session_id: Uuid,
    state: Arc<RwLock<SessionInner>>,
    catalog: Arc<dyn CatalogSource>,
    sink: Arc<dyn ScanEventSink>,
    default_quantity: u32,
    mut codes_rx: mpsc::Receiver<DecodedCode>,
) {
    while let Some(decoded) = codes_rx.recv().await {
        let notice = {
            let mut inner = state.write().await;
            let snapshot = catalog.snapshot();
            inner.accept_decoded(&decoded, &snapshot, default_quantity)
        };

        match notice {
            Some(notice @ ScanNotice::Matched { .. }) => {
                debug!(%session_id, code = %decoded.text, "Product staged");
                sink.on_notice(&notice);
            }
            Some(notice) => {
                debug!(%session_id, code = %decoded.text, "No product for code");
                sink.on_notice(&notice);
            }
            None => {}
        }
    }

    trace!(%session_id, "Code router exited");
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a ScanSession with options.
pub struct ScanSessionBuilder {
    config: ScanConfig,
    camera: Option<Arc<dyn CameraDevice>>,
    decoder: Option<Arc<dyn BarcodeDecoder>>,
    catalog: Option<Arc<dyn CatalogSource>>,
    sink: Option<Arc<dyn ScanEventSink>>,
}

impl ScanSessionBuilder {
    pub fn new(config: ScanConfig) -> Self {
        ScanSessionBuilder {
            config,
            camera: None,
            decoder: None,
            catalog: None,
            sink: None,
        }
    }

    pub fn with_camera(mut self, camera: Arc<dyn CameraDevice>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Sets the barcode decoder. Defaults to [`MultiFormatDecoder`].
    pub fn with_decoder(mut self, decoder: Arc<dyn BarcodeDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the event sink. Defaults to [`NoOpSink`].
    pub fn with_sink(mut self, sink: Arc<dyn ScanEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the session in the Idle state.
    pub fn build(self) -> ScanResult<ScanSession> {
        self.config.validate()?;

        let camera = self
            .camera
            .ok_or_else(|| ScanError::InvalidConfig("Camera required".into()))?;
        let catalog = self
            .catalog
            .ok_or_else(|| ScanError::InvalidConfig("Catalog source required".into()))?;
        let decoder = self.decoder.unwrap_or_else(|| Arc::new(MultiFormatDecoder));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NoOpSink));

        let capture = CaptureManager::new(
            camera,
            FrameDecoder::new(decoder),
            self.config.crop,
            self.config.capture.interval(),
            StreamRequest::video(self.config.capture.facing),
        )
        .with_preview(self.config.capture.preview);

        let id = Uuid::new_v4();
        debug!(session_id = %id, "Scan session created");

        Ok(ScanSession {
            id,
            config: Arc::new(self.config),
            catalog,
            sink,
            state: Arc::new(RwLock::new(SessionInner::new())),
            capture,
            router: None,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
