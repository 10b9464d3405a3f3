//! # Camera Abstraction
//!
//! The seam between the capture loop and whatever produces video frames.
//!
//! ## Stream Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CameraDevice::open(request) ──► CameraStream                           │
//! │                                      │                                  │
//! │                                      ├── ready().await   (metadata)    │
//! │                                      ├── play().await    (playback)    │
//! │                                      │                                  │
//! │                                      ├── grab_frame()    (every tick)  │
//! │                                      │                                  │
//! │                                      └── stop()          (all tracks)  │
//! │                                                                         │
//! │  At most one stream per session. stop() is idempotent and must leave   │
//! │  is_live() == false.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Platform backends live outside this crate; the shipped [`ReplayCamera`]
//! serves still images and backs the `scan-replay` binary.

mod replay;

pub use replay::ReplayCamera;

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;

use crate::config::FacingMode;
use crate::error::CameraError;

// =============================================================================
// Stream Request
// =============================================================================

/// Constraints passed when acquiring a stream. Streams are video only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: FacingMode,
}

impl StreamRequest {
    pub fn video(facing: FacingMode) -> Self {
        StreamRequest { facing }
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        StreamRequest::video(FacingMode::Environment)
    }
}

// =============================================================================
// Video Frame
// =============================================================================

/// One raw frame at the stream's native resolution.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pixels: RgbaImage,
}

impl VideoFrame {
    pub fn new(pixels: RgbaImage) -> Self {
        VideoFrame { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

// =============================================================================
// Camera Traits
// =============================================================================

/// A video input that can hand out streams.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Acquires a stream. Fails with a [`CameraError`] the operator can act on.
    async fn open(&self, request: &StreamRequest) -> Result<Arc<dyn CameraStream>, CameraError>;
}

/// A live video stream exclusively owned by one capture manager.
#[async_trait]
pub trait CameraStream: Send + Sync {
    /// Resolves once frame dimensions are known.
    async fn ready(&self) -> Result<(), CameraError>;

    /// Starts playback.
    async fn play(&self) -> Result<(), CameraError>;

    /// The current frame, read fresh. `None` while no frame is available.
    fn grab_frame(&self) -> Option<VideoFrame>;

    /// Stops every track. Safe to call more than once.
    fn stop(&self);

    /// True while any track is still running.
    fn is_live(&self) -> bool;
}
