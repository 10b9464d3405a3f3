//! Still-image camera.
//!
//! Serves a fixed list of frames in order, one per grab, wrapping around at
//! the end. Used by the `scan-replay` binary and handy for demos without a
//! webcam.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, info, warn};

use super::{CameraDevice, CameraStream, StreamRequest, VideoFrame};
use crate::error::CameraError;

/// Image extensions picked up by [`ReplayCamera::from_dir`].
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A camera backed by still images.
#[derive(Debug, Clone)]
pub struct ReplayCamera {
    frames: Arc<Vec<RgbaImage>>,
}

impl ReplayCamera {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        ReplayCamera {
            frames: Arc::new(frames),
        }
    }

    /// Loads every PNG/JPEG in `dir`, sorted by file name.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match image::open(path) {
                Ok(img) => frames.push(img.to_rgba8()),
                Err(e) => warn!(?path, error = %e, "Skipping unreadable frame"),
            }
        }

        info!(count = frames.len(), ?dir, "Loaded replay frames");
        Ok(Self::new(frames))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl CameraDevice for ReplayCamera {
    async fn open(&self, request: &StreamRequest) -> Result<Arc<dyn CameraStream>, CameraError> {
        if self.frames.is_empty() {
            return Err(CameraError::NoDevice);
        }

        debug!(facing = %request.facing, "Opening replay stream");
        Ok(Arc::new(ReplayStream {
            frames: Arc::clone(&self.frames),
            cursor: AtomicUsize::new(0),
            live: AtomicBool::new(true),
        }))
    }
}

struct ReplayStream {
    frames: Arc<Vec<RgbaImage>>,
    cursor: AtomicUsize,
    live: AtomicBool,
}

impl ReplayStream {
    /// Index of the next frame, and whether this grab starts a new cycle.
    fn advance(&self) -> (usize, bool) {
        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        let index = cursor % self.frames.len();
        (index, index == 0 && cursor > 0)
    }
}

#[async_trait]
impl CameraStream for ReplayStream {
    async fn ready(&self) -> Result<(), CameraError> {
        Ok(())
    }

    async fn play(&self) -> Result<(), CameraError> {
        if !self.live.load(Ordering::Acquire) {
            return Err(CameraError::Other("stream already stopped".into()));
        }
        Ok(())
    }

    fn grab_frame(&self) -> Option<VideoFrame> {
        if !self.live.load(Ordering::Acquire) || self.frames.is_empty() {
            return None;
        }
        let (index, wrapped) = self.advance();
        if wrapped {
            debug!(frames = self.frames.len(), "Replay wrapped around");
        }
        self.frames.get(index).cloned().map(VideoFrame::new)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            debug!("Replay stream stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}
