//! # Scan Error Types
//!
//! Error types for the scan pipeline.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Camera      │  │    Session      │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  PermissionDen. │  │  SessionClosed  │  │  InvalidConfig          │ │
//! │  │  NoDevice       │  │  NothingStaged  │  │  ConfigLoadFailed       │ │
//! │  │  DeviceBusy     │  │  Core(..)       │  │  CatalogLoadFailed      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  NOT ERRORS: decode misses, resolution misses, variant disambiguation. │
//! │  Those are ordinary session outcomes reported through ScanNotice.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use titan_core::CoreError;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

// =============================================================================
// Camera Errors
// =============================================================================

/// Why a camera stream could not be acquired or kept alive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    /// The user or OS refused camera access.
    #[error("Camera permission denied")]
    PermissionDenied,

    /// No video input device is available.
    #[error("No camera found")]
    NoDevice,

    /// The device exists but another process holds it.
    #[error("Camera is in use by another application")]
    DeviceBusy,

    /// Any other acquisition or playback failure.
    #[error("Camera failure: {0}")]
    Other(String),
}

// =============================================================================
// Scan Error
// =============================================================================

/// Scan error type covering everything the pipeline can report.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Camera Errors
    // =========================================================================
    /// Camera acquisition failed. The session stays Idle and may retry.
    #[error(transparent)]
    Camera(#[from] CameraError),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The session was closed; the host must open a new one.
    #[error("Scan session is closed")]
    SessionClosed,

    /// An action needs a staged product but none is staged.
    #[error("No scanned product is waiting to be added")]
    NothingStaged,

    /// A domain rule rejected the action.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to read or parse a catalog file.
    #[error("Failed to load catalog: {0}")]
    CatalogLoadFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

/// Config file I/O. Catalog reads map their own I/O errors to
/// [`ScanError::CatalogLoadFailed`].
impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::InvalidConfig(err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::CatalogLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if the operator can simply try again.
    ///
    /// ## Retryable Errors
    /// - Camera permission/busy/missing (fix the cause, press start again)
    /// - Nothing staged (scan something first)
    ///
    /// ## Non-Retryable Errors
    /// - Closed sessions
    /// - Configuration problems
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::Camera(_) | ScanError::NothingStaged)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_) | ScanError::ConfigLoadFailed(_) | ScanError::CatalogLoadFailed(_)
        )
    }
}
