//! # Crop Geometry
//!
//! Computes the centered crop window searched for a barcode on every tick.
//!
//! ## Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Raw frame (W × H)                                                      │
//! │                                                                         │
//! │        ┌───────────────────────────────┐                                │
//! │        │                               │  1. target aspect 3:2          │
//! │        │        crop (w × h)           │  2. 60% of the limiting side   │
//! │        │                               │  3. w ∈ [240, 600]             │
//! │        │                               │     h ∈ [80, 400]              │
//! │        └───────────────────────────────┘  4. centered                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Barcodes are wide and held in the middle of the frame, so a centered
//! landscape window both focuses the decoder and cuts per-frame decode cost.
//! The same region drives the overlay guide and the pixel extraction.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Crop Region
// =============================================================================

/// A rectangle in raw-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// True if the region lies entirely inside a `frame_width × frame_height` frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(frame_width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(frame_height)
    }

    /// The region as percentages of the frame, for drawing the guide overlay.
    pub fn overlay_guide(&self, frame_width: u32, frame_height: u32) -> OverlayGuide {
        let pct = |part: u32, whole: u32| {
            if whole == 0 {
                0.0
            } else {
                f64::from(part) * 100.0 / f64::from(whole)
            }
        };

        OverlayGuide {
            left_pct: pct(self.x, frame_width),
            top_pct: pct(self.y, frame_height),
            width_pct: pct(self.width, frame_width),
            height_pct: pct(self.height, frame_height),
        }
    }
}

/// Crop region relative to the frame, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OverlayGuide {
    pub left_pct: f64,
    pub top_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

// =============================================================================
// Crop Policy
// =============================================================================

/// Size and aspect policy for the crop window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropPolicy {
    /// Width divided by height of the window (3:2 = 1.5).
    #[serde(default = "default_target_aspect")]
    pub target_aspect: f64,

    /// Share of the limiting frame dimension the window covers.
    #[serde(default = "default_size_factor")]
    pub size_factor: f64,

    #[serde(default = "default_min_width")]
    pub min_width: u32,

    #[serde(default = "default_max_width")]
    pub max_width: u32,

    #[serde(default = "default_min_height")]
    pub min_height: u32,

    #[serde(default = "default_max_height")]
    pub max_height: u32,
}

fn default_target_aspect() -> f64 {
    3.0 / 2.0
}

fn default_size_factor() -> f64 {
    0.6
}

fn default_min_width() -> u32 {
    240
}

fn default_max_width() -> u32 {
    600
}

fn default_min_height() -> u32 {
    80
}

fn default_max_height() -> u32 {
    400
}

impl Default for CropPolicy {
    fn default() -> Self {
        CropPolicy {
            target_aspect: default_target_aspect(),
            size_factor: default_size_factor(),
            min_width: default_min_width(),
            max_width: default_max_width(),
            min_height: default_min_height(),
            max_height: default_max_height(),
        }
    }
}

impl CropPolicy {
    /// Computes the crop window for one frame.
    ///
    /// Returns `None` when either dimension is zero (the stream has not
    /// reported its size yet); callers skip the tick.
    ///
    /// ## Steps
    /// 1. If the frame is wider than the target aspect, size from the
    ///    height (`h = f·H`, `w = h·aspect`), otherwise from the width
    ///    (`w = f·W`, `h = w / aspect`).
    /// 2. Never wider than the frame.
    /// 3. Clamp to the pixel bounds, then to the frame again.
    /// 4. Center.
    pub fn compute(&self, frame_width: u32, frame_height: u32) -> Option<CropRegion> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }

        let fw = f64::from(frame_width);
        let fh = f64::from(frame_height);
        let frame_aspect = fw / fh;

        let (candidate_w, candidate_h) = if frame_aspect / self.target_aspect > 1.0 {
            let h = fh * self.size_factor;
            (h * self.target_aspect, h)
        } else {
            let w = fw * self.size_factor;
            (w, w / self.target_aspect)
        };

        let candidate_w = candidate_w.min(fw);

        let width = bound(candidate_w, self.min_width, self.max_width, frame_width);
        let height = bound(candidate_h, self.min_height, self.max_height, frame_height);

        Some(CropRegion {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        })
    }

    /// Checks the policy is usable.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.target_aspect.is_finite() && self.target_aspect > 0.0) {
            return Err(format!("target_aspect must be positive, got {}", self.target_aspect));
        }
        if !(self.size_factor > 0.0 && self.size_factor <= 1.0) {
            return Err(format!("size_factor must be in (0, 1], got {}", self.size_factor));
        }
        if self.min_width > self.max_width {
            return Err(format!(
                "min_width {} exceeds max_width {}",
                self.min_width, self.max_width
            ));
        }
        if self.min_height > self.max_height {
            return Err(format!(
                "min_height {} exceeds max_height {}",
                self.min_height, self.max_height
            ));
        }
        Ok(())
    }
}

/// Rounds, clamps to `[min, max]`, then to `1..=frame`.
fn bound(candidate: f64, min: u32, max: u32, frame: u32) -> u32 {
    // `as` saturates for out-of-range floats
    let rounded = candidate.round() as u32;
    rounded.max(min).min(max).min(frame).max(1)
}

/// Crop window for a frame under the default policy.
pub fn compute_crop(frame_width: u32, frame_height: u32) -> Option<CropRegion> {
    CropPolicy::default().compute(frame_width, frame_height)
}

// =============================================================================
// Unit Tests
// =============================================================================
