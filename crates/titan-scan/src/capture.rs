//! # Capture Manager
//!
//! Owns the camera stream and the tick loop that feeds frames to the decoder.
//!
//! ## Tick Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Capture Tick (100ms)                             │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────────┐   │
//! │  │  grab    │────►│  crop    │────►│ publish  │────►│ decode       │   │
//! │  │  frame   │     │  region  │     │ preview  │     │ (blocking)   │   │
//! │  └────┬─────┘     └────┬─────┘     └──────────┘     └──────┬───────┘   │
//! │       │                │                                    │           │
//! │   no frame /      compute() per                       Some(code)        │
//! │   0×0 → skip      tick, never cached                        │           │
//! │                                                              ▼           │
//! │                                              DecodedCode { seq, text }  │
//! │                                                   → session router      │
//! │                                                                         │
//! │  One decode at a time: the next tick waits for the in-flight decode,   │
//! │  ticks missed meanwhile are skipped.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Teardown Order
//! 1. Drop the shutdown sender (the loop exits at its next await)
//! 2. Abort the loop task
//! 3. Close the decode gate (waits out a decode already on the blocking pool)
//! 4. Stop every track of the stream
//!
//! Once `stop()` returns the decoder is never entered again for this run.
//! `stop()` is idempotent and also runs on drop.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use titan_core::{CropPolicy, CropRegion, OverlayGuide};

use crate::camera::{CameraDevice, CameraStream, StreamRequest};
use crate::decoder::{DecodeGate, FrameDecoder};
use crate::error::CameraError;

// =============================================================================
// Tick Outputs
// =============================================================================

/// A code decoded on a given tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    /// Tick sequence number, strictly increasing per capture run.
    pub seq: u64,
    pub text: String,
}

/// The most recent crop, for a live preview next to the video.
#[derive(Debug, Clone)]
pub struct CropPreview {
    pub seq: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub region: CropRegion,
    pub pixels: Arc<RgbaImage>,
}

impl CropPreview {
    /// Where to draw the guide rectangle over the video.
    pub fn overlay_guide(&self) -> OverlayGuide {
        self.region.overlay_guide(self.frame_width, self.frame_height)
    }
}

pub type PreviewReceiver = watch::Receiver<Option<Arc<CropPreview>>>;

// =============================================================================
// Capture Manager
// =============================================================================

/// Acquires the camera and runs the capture tick loop.
pub struct CaptureManager {
    camera: Arc<dyn CameraDevice>,
    frames: FrameDecoder,
    policy: CropPolicy,
    interval: Duration,
    request: StreamRequest,
    publish_preview: bool,

    /// Current stream (set while running).
    stream: Option<Arc<dyn CameraStream>>,

    /// Dropping this ends the tick loop.
    shutdown_tx: Option<mpsc::Sender<()>>,

    /// Tick loop task.
    ticker: Option<JoinHandle<()>>,

    /// Decode gate of the current run.
    gate: Option<DecodeGate>,

    preview: Arc<watch::Sender<Option<Arc<CropPreview>>>>,
}

impl CaptureManager {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        frames: FrameDecoder,
        policy: CropPolicy,
        interval: Duration,
        request: StreamRequest,
    ) -> Self {
        let (preview, _rx) = watch::channel(None);
        CaptureManager {
            camera,
            frames,
            policy,
            interval,
            request,
            publish_preview: true,
            stream: None,
            shutdown_tx: None,
            ticker: None,
            gate: None,
            preview: Arc::new(preview),
        }
    }

    /// Enables or disables publishing crops to the preview channel.
    pub fn with_preview(mut self, enabled: bool) -> Self {
        self.publish_preview = enabled;
        self
    }

    /// True while a stream is held and the tick loop runs.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Receiver for the latest crop preview. `None` while not capturing.
    pub fn subscribe_preview(&self) -> PreviewReceiver {
        self.preview.subscribe()
    }

    /// Acquires the stream and starts ticking.
    ///
    /// On failure nothing is held: no stream, no timer. Calling `start` on a
    /// running manager is a no-op.
    pub async fn start(&mut self, codes: mpsc::Sender<DecodedCode>) -> Result<(), CameraError> {
        if self.is_running() {
            debug!("Capture already running");
            return Ok(());
        }

        let stream = self.camera.open(&self.request).await?;

        let playing = match stream.ready().await {
            Ok(()) => stream.play().await,
            Err(e) => Err(e),
        };
        if let Err(e) = playing {
            stream.stop();
            return Err(e);
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let gate = DecodeGate::new();

        let tick_loop = TickLoop {
            stream: Arc::clone(&stream),
            frames: self.frames.clone(),
            gate: gate.clone(),
            policy: self.policy,
            publish_preview: self.publish_preview,
            preview: Arc::clone(&self.preview),
            codes,
        };
        let ticker = tokio::spawn(tick_loop.run(self.interval, shutdown_rx));

        self.stream = Some(stream);
        self.shutdown_tx = Some(shutdown_tx);
        self.ticker = Some(ticker);
        self.gate = Some(gate);

        info!(
            interval_ms = self.interval.as_millis() as u64,
            facing = %self.request.facing,
            "Capture started"
        );
        Ok(())
    }

    /// Cancels the timer and releases the camera. Safe to call in any state.
    ///
    /// Blocks for at most one decode if the decoder is running.
    pub fn stop(&mut self) {
        let was_running = self.stream.is_some();

        // Timer first, so no tick can grab from a stopping stream
        drop(self.shutdown_tx.take());
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        // Abort cannot reach a decode already handed to the blocking pool
        if let Some(gate) = self.gate.take() {
            gate.close();
        }

        if let Some(stream) = self.stream.take() {
            stream.stop();
        }

        self.preview.send_replace(None);

        if was_running {
            info!("Capture stopped");
        }
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Tick Loop
// =============================================================================

struct TickLoop {
    stream: Arc<dyn CameraStream>,
    frames: FrameDecoder,
    gate: DecodeGate,
    policy: CropPolicy,
    publish_preview: bool,
    preview: Arc<watch::Sender<Option<Arc<CropPreview>>>>,
    codes: mpsc::Sender<DecodedCode>,
}

impl TickLoop {
    async fn run(self, period: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {}
            }

            seq += 1;
            let Some(crop) = self.capture_crop(seq) else {
                continue;
            };

            let decoded = tokio::select! {
                biased;

                _ = shutdown_rx.recv() => break,
                decoded = self.frames.decode(crop, &self.gate) => decoded,
            };

            if let Some(text) = decoded {
                debug!(seq, code = %text, "Decoded code");
                if self.codes.send(DecodedCode { seq, text }).await.is_err() {
                    debug!("Code receiver gone, ending capture loop");
                    break;
                }
            }
        }

        trace!("Capture loop exited");
    }

    /// Grabs the current frame and copies out this tick's crop window.
    fn capture_crop(&self, seq: u64) -> Option<Arc<RgbaImage>> {
        let Some(frame) = self.stream.grab_frame() else {
            trace!(seq, "No frame available, skipping tick");
            return None;
        };

        let (frame_width, frame_height) = (frame.width(), frame.height());
        let Some(region) = self.policy.compute(frame_width, frame_height) else {
            trace!(seq, frame_width, frame_height, "Frame has no dimensions yet, skipping tick");
            return None;
        };

        let crop = Arc::new(FrameDecoder::extract(&frame.pixels, region));

        if self.publish_preview {
            self.preview.send_replace(Some(Arc::new(CropPreview {
                seq,
                frame_width,
                frame_height,
                region,
                pixels: Arc::clone(&crop),
            })));
        }

        Some(crop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodeError;
    use crate::testing::{MockCamera, ScriptedDecoder};

    const FAST: Duration = Duration::from_millis(10);

    fn manager(camera: Arc<MockCamera>, decoder: Arc<ScriptedDecoder>) -> CaptureManager {
        CaptureManager::new(
            camera,
            FrameDecoder::new(decoder),
            CropPolicy::default(),
            FAST,
            StreamRequest::default(),
        )
    }

    #[tokio::test]
    async fn test_start_failure_holds_nothing() {
        let camera = Arc::new(MockCamera::failing(CameraError::PermissionDenied));
        let mut capture = manager(camera.clone(), Arc::new(ScriptedDecoder::new(vec![])));
        let (tx, _rx) = mpsc::channel(8);

        let err = capture.start(tx).await.unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert!(!capture.is_running());
        assert!(!camera.stream_live());
    }

    #[tokio::test]
    async fn test_decoded_codes_carry_increasing_sequence() {
        let camera = Arc::new(MockCamera::new(640, 480));
        let decoder = Arc::new(ScriptedDecoder::new(vec![
            Ok("A".to_string()),
            Err(DecodeError::NotFound),
            Ok("B".to_string()),
        ]));
        let mut capture = manager(camera, decoder);
        let (tx, mut rx) = mpsc::channel(8);

        capture.start(tx).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        capture.stop();

        assert_eq!(first.text, "A");
        assert_eq!(second.text, "B");
        assert!(second.seq > first.seq);
    }

    #[tokio::test]
    async fn test_zero_sized_frames_are_never_decoded() {
        let camera = Arc::new(MockCamera::new(0, 0));
        let decoder = Arc::new(ScriptedDecoder::repeating("X"));
        let mut capture = manager(camera, decoder.clone());
        let (tx, _rx) = mpsc::channel(8);

        capture.start(tx).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        capture.stop();

        assert_eq!(decoder.attempts(), 0);
    }

    #[tokio::test]
    async fn test_stop_releases_camera_and_halts_decoding() {
        let camera = Arc::new(MockCamera::new(1280, 720));
        let decoder = Arc::new(ScriptedDecoder::new(vec![]));
        let mut capture = manager(camera.clone(), decoder.clone());
        let (tx, _rx) = mpsc::channel(8);

        capture.start(tx).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(decoder.attempts() > 0);

        capture.stop();
        assert!(!camera.stream_live());
        assert!(!capture.is_running());

        let after_stop = decoder.attempts();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(decoder.attempts(), after_stop);

        // Second stop is harmless
        capture.stop();
    }

    #[tokio::test]
    async fn test_decode_in_flight_at_stop_is_the_last() {
        let camera = Arc::new(MockCamera::new(1280, 720));
        let decoder = Arc::new(ScriptedDecoder::slow("COLA-330", Duration::from_millis(60)));
        let mut capture = CaptureManager::new(
            camera.clone(),
            FrameDecoder::new(decoder.clone()),
            CropPolicy::default(),
            Duration::from_millis(100),
            StreamRequest::default(),
        );
        let (tx, mut rx) = mpsc::channel(8);

        capture.start(tx).await.unwrap();
        while decoder.attempts() == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        capture.stop();
        let after_stop = decoder.attempts();
        assert_eq!(decoder.finished(), after_stop);
        assert!(!camera.stream_live());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(decoder.attempts(), after_stop);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_preview_tracks_crop_region() {
        let camera = Arc::new(MockCamera::new(1280, 720));
        let mut capture = manager(camera, Arc::new(ScriptedDecoder::new(vec![])));
        let mut preview = capture.subscribe_preview();
        let (tx, _rx) = mpsc::channel(8);

        capture.start(tx).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), preview.changed())
            .await
            .unwrap()
            .unwrap();

        let latest = preview.borrow_and_update().clone().unwrap();
        assert_eq!(latest.region.width, 600);
        assert_eq!(latest.region.height, 400);
        assert_eq!(latest.pixels.dimensions(), (600, 400));
        assert!((latest.overlay_guide().width_pct - 46.875).abs() < 1e-9);

        capture.stop();
        assert!(preview.borrow().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_camera() {
        let camera = Arc::new(MockCamera::new(640, 480));
        {
            let mut capture = manager(camera.clone(), Arc::new(ScriptedDecoder::new(vec![])));
            let (tx, _rx) = mpsc::channel(8);
            capture.start(tx).await.unwrap();
            assert!(camera.stream_live());
        }
        assert!(!camera.stream_live());
    }
}
