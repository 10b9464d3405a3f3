//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{GrayImage, RgbaImage};
use tokio::sync::mpsc;

use titan_core::{Product, ProductVariant, ScannedLine, VariantPrice};

use crate::camera::{CameraDevice, CameraStream, StreamRequest, VideoFrame};
use crate::decoder::{BarcodeDecoder, DecodeError};
use crate::error::CameraError;
use crate::session::{ScanEventSink, ScanNotice};

// =============================================================================
// Mock Camera
// =============================================================================

/// Camera that serves blank frames of a fixed size.
pub struct MockCamera {
    width: u32,
    height: u32,
    failure: Mutex<Option<CameraError>>,
    live: Arc<AtomicBool>,
    opens: AtomicUsize,
}

impl MockCamera {
    pub fn new(width: u32, height: u32) -> Self {
        MockCamera {
            width,
            height,
            failure: Mutex::new(None),
            live: Arc::new(AtomicBool::new(false)),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: CameraError) -> Self {
        let camera = Self::new(1280, 720);
        camera.set_failure(Some(error));
        camera
    }

    pub fn set_failure(&self, error: Option<CameraError>) {
        *self.failure.lock().unwrap() = error;
    }

    /// True while the last opened stream has a running track.
    pub fn stream_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn open(&self, _request: &StreamRequest) -> Result<Arc<dyn CameraStream>, CameraError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.live.store(true, Ordering::SeqCst);
        Ok(Arc::new(MockStream {
            width: self.width,
            height: self.height,
            live: Arc::clone(&self.live),
        }))
    }
}

struct MockStream {
    width: u32,
    height: u32,
    live: Arc<AtomicBool>,
}

#[async_trait]
impl CameraStream for MockStream {
    async fn ready(&self) -> Result<(), CameraError> {
        Ok(())
    }

    async fn play(&self) -> Result<(), CameraError> {
        Ok(())
    }

    fn grab_frame(&self) -> Option<VideoFrame> {
        self.is_live()
            .then(|| VideoFrame::new(RgbaImage::new(self.width, self.height)))
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Scripted Decoder
// =============================================================================

/// Decoder that replays a script, then keeps returning a fallback.
pub struct ScriptedDecoder {
    script: Mutex<VecDeque<Result<String, DecodeError>>>,
    fallback: Result<String, DecodeError>,
    delay: Option<Duration>,
    attempts: AtomicUsize,
    finished: AtomicUsize,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<Result<String, DecodeError>>) -> Self {
        ScriptedDecoder {
            script: Mutex::new(script.into()),
            fallback: Err(DecodeError::NotFound),
            delay: None,
            attempts: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    /// Decodes `code` on every attempt, blocking for `delay` each time.
    pub fn slow(code: &str, delay: Duration) -> Self {
        ScriptedDecoder {
            delay: Some(delay),
            ..Self::repeating(code)
        }
    }

    /// Decodes `code` on every attempt.
    pub fn repeating(code: &str) -> Self {
        ScriptedDecoder {
            fallback: Ok(code.to_string()),
            ..Self::new(vec![])
        }
    }

    /// Times the decoder was entered.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Times the decoder returned.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl BarcodeDecoder for ScriptedDecoder {
    fn decode(&self, _image: &GrayImage) -> Result<String, DecodeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        self.finished.fetch_add(1, Ordering::SeqCst);
        outcome
    }
}

// =============================================================================
// Channel Sink
// =============================================================================

#[derive(Debug, Clone)]
pub enum SinkEvent {
    Notice(ScanNotice),
    Scanned(ScannedLine),
}

/// Sink that forwards every callback into a channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelSink { tx }), rx)
    }
}

impl ScanEventSink for ChannelSink {
    fn on_notice(&self, notice: &ScanNotice) {
        let _ = self.tx.send(SinkEvent::Notice(notice.clone()));
    }

    fn on_product_scanned(&self, line: &ScannedLine) {
        let _ = self.tx.send(SinkEvent::Scanned(line.clone()));
    }
}

/// Waits up to two seconds for the next notice matching `pred`.
pub async fn wait_for_notice<F>(rx: &mut mpsc::UnboundedReceiver<SinkEvent>, mut pred: F) -> ScanNotice
where
    F: FnMut(&ScanNotice) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Some(SinkEvent::Notice(notice)) if pred(&notice) => return notice,
                Some(_) => continue,
                None => panic!("sink closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for notice")
}

// =============================================================================
// Catalog Fixtures
// =============================================================================

pub fn variant(id: &str, sku: Option<&str>, usd: i64) -> ProductVariant {
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

pub fn product(id: &str, variants: Vec<ProductVariant>) -> Product {
    Product {
        id: id.to_string(),
        title: format!("Product {}", id),
        thumbnail: None,
        variants,
    }
}
