//! # Scanner Configuration
//!
//! Configuration management for the scan pipeline.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TITAN_SCAN_INTERVAL_MS=150                                         │
//! │     TITAN_SCAN_FACING=user                                             │
//! │     TITAN_SCAN_CURRENCY=eur                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/titan-pos/scanner.toml (Linux)                           │
//! │     ~/Library/Application Support/com.titan.pos/scanner.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     100ms ticks, rear camera, 3:2 crop, usd                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [capture]
//! interval_ms = 100
//! facing = "environment"  # environment | user | any
//! preview = true
//!
//! [crop]
//! target_aspect = 1.5
//! size_factor = 0.6
//! min_width = 240
//! max_width = 600
//! min_height = 80
//! max_height = 400
//!
//! [order]
//! currency_code = "usd"
//! default_quantity = 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use titan_core::validation::validate_quantity;
use titan_core::{CropPolicy, DEFAULT_LINE_QUANTITY};

use crate::error::{ScanError, ScanResult};

/// Lower bound for the capture period. Shorter periods starve the decoder.
pub const MIN_INTERVAL_MS: u64 = 20;

// =============================================================================
// Facing Mode
// =============================================================================

/// Which camera the stream request prefers.
///
/// A preference, not a requirement: a laptop with only a front camera still
/// gets a stream when `Environment` is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Rear camera, pointing away from the operator.
    #[default]
    Environment,

    /// Front camera, pointing at the operator.
    User,

    /// Whatever device the platform offers first.
    Any,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
            FacingMode::Any => write!(f, "any"),
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            "any" => Ok(FacingMode::Any),
            other => Err(ScanError::InvalidConfig(format!(
                "Unknown facing mode: '{}'. Valid options: environment, user, any",
                other
            ))),
        }
    }
}

// =============================================================================
// Capture Settings
// =============================================================================

/// Camera and tick-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Period between frame captures (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Preferred camera.
    #[serde(default)]
    pub facing: FacingMode,

    /// Publish the cropped buffer for a live preview.
    #[serde(default = "default_true")]
    pub preview: bool,
}

fn default_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            interval_ms: default_interval_ms(),
            facing: FacingMode::default(),
            preview: true,
        }
    }
}

impl CaptureSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// =============================================================================
// Order Settings
// =============================================================================

/// How confirmed scans are turned into order lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    /// Currency used to price emitted lines.
    #[serde(default = "default_currency")]
    pub currency_code: String,

    /// Quantity a freshly staged line starts with.
    #[serde(default = "default_quantity")]
    pub default_quantity: u32,
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_quantity() -> u32 {
    DEFAULT_LINE_QUANTITY
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            currency_code: default_currency(),
            default_quantity: default_quantity(),
        }
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Crop window policy.
    #[serde(default)]
    pub crop: CropPolicy,

    #[serde(default)]
    pub order: OrderSettings,
}

impl ScanConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Scanner config not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        if self.capture.interval_ms < MIN_INTERVAL_MS {
            return Err(ScanError::InvalidConfig(format!(
                "interval_ms must be at least {}, got {}",
                MIN_INTERVAL_MS, self.capture.interval_ms
            )));
        }

        self.crop.validate().map_err(ScanError::InvalidConfig)?;

        let currency = &self.order.currency_code;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ScanError::InvalidConfig(format!(
                "currency_code must be a 3-letter ISO code, got '{}'",
                currency
            )));
        }

        validate_quantity(i64::from(self.order.default_quantity))
            .map_err(|e| ScanError::InvalidConfig(format!("default_quantity: {}", e)))?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(interval) = std::env::var("TITAN_SCAN_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => {
                    debug!(interval_ms = ms, "Overriding capture interval from environment");
                    self.capture.interval_ms = ms;
                }
                Err(_) => warn!(value = %interval, "Ignoring non-numeric TITAN_SCAN_INTERVAL_MS"),
            }
        }

        if let Ok(facing) = std::env::var("TITAN_SCAN_FACING") {
            match facing.parse() {
                Ok(parsed) => {
                    debug!(facing = %facing, "Overriding facing mode from environment");
                    self.capture.facing = parsed;
                }
                Err(_) => warn!(facing = %facing, "Unknown facing mode in environment"),
            }
        }

        if let Ok(currency) = std::env::var("TITAN_SCAN_CURRENCY") {
            debug!(currency = %currency, "Overriding currency from environment");
            self.order.currency_code = currency;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "titan", "pos")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_mode_parsing() {
        assert_eq!("environment".parse::<FacingMode>().unwrap(), FacingMode::Environment);
        assert_eq!("REAR".parse::<FacingMode>().unwrap(), FacingMode::Environment);
        assert_eq!("front".parse::<FacingMode>().unwrap(), FacingMode::User);
        assert_eq!("any".parse::<FacingMode>().unwrap(), FacingMode::Any);
        assert!("sideways".parse::<FacingMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.capture.interval(), Duration::from_millis(100));
        assert_eq!(config.capture.facing, FacingMode::Environment);
        assert_eq!(config.crop, CropPolicy::default());
        assert_eq!(config.order.currency_code, "usd");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScanConfig = toml::from_str(
            r#"
            [capture]
            facing = "user"

            [crop]
            max_width = 800
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.facing, FacingMode::User);
        assert_eq!(config.capture.interval_ms, 100);
        assert_eq!(config.crop.max_width, 800);
        assert_eq!(config.crop.min_width, 240);
        assert_eq!(config.order.currency_code, "usd");
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScanConfig::default();

        config.capture.interval_ms = 5;
        assert!(config.validate().unwrap_err().is_config_error());

        config.capture.interval_ms = 100;
        config.order.currency_code = "dollars".to_string();
        assert!(config.validate().is_err());

        config.order.currency_code = "EUR".to_string();
        config.crop.min_height = 500;
        assert!(config.validate().is_err());

        config.crop = CropPolicy::default();
        config.order.default_quantity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ScanConfig::default()).unwrap();
        assert!(toml_str.contains("[capture]"));
        assert!(toml_str.contains("[crop]"));
        assert!(toml_str.contains("[order]"));
    }
}
