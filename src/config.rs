//! Configuration management for SnapCrab
//!
//! Loads, saves and validates the TOML file that seeds a camera session:
//! which camera to open first, the manual focus ramp cadence and the
//! capture format requested from desktop backends.

use crate::errors::CameraError;
use crate::types::DevicePosition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while reading or writing the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CameraError {
    fn from(e: ConfigError) -> Self {
        CameraError::InitializationError(e.to_string())
    }
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SnapCrabConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Camera opened by `initialize`
    pub initial_position: DevicePosition,
    /// Start in manual focus mode (taps lock focus and start the lens ramp)
    pub manual_focus: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Lens position increment per ramp tick
    pub ramp_step: f32,
    /// Delay between ramp ticks in milliseconds.
    ///
    /// The default reproduces the historical ten second cadence. A smooth
    /// sweep would want something closer to 10ms; pending product sign-off.
    pub ramp_interval_ms: u64,
    /// Restrict auto focus to near range whenever a device is bound
    pub restrict_range_on_bind: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Requested resolution [width, height] for desktop backends
    pub resolution: [u32; 2],
    pub fps: u32,
}

pub const DEFAULT_RAMP_STEP: f32 = 0.01;
pub const DEFAULT_RAMP_INTERVAL: Duration = Duration::from_secs(10);

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_position: DevicePosition::Back,
            manual_focus: false,
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            ramp_step: DEFAULT_RAMP_STEP,
            ramp_interval_ms: DEFAULT_RAMP_INTERVAL.as_millis() as u64,
            restrict_range_on_bind: true,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            resolution: [1920, 1080],
            fps: 30,
        }
    }
}

impl FocusConfig {
    pub fn ramp_interval(&self) -> Duration {
        Duration::from_millis(self.ramp_interval_ms)
    }
}

impl SnapCrabConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: SnapCrabConfig = toml::from_str(&contents)?;
        config.validate().map_err(ConfigError::Invalid)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("snapcrab.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(self.focus.ramp_step > 0.0 && self.focus.ramp_step <= 1.0) {
            return Err("Ramp step must be in (0.0, 1.0]".to_string());
        }
        if self.focus.ramp_interval_ms == 0 {
            return Err("Ramp interval must be greater than zero".to_string());
        }
        if self.capture.resolution[0] == 0 || self.capture.resolution[1] == 0 {
            return Err("Invalid capture resolution".to_string());
        }
        if self.capture.fps == 0 || self.capture.fps > 240 {
            return Err("Invalid capture FPS (must be 1-240)".to_string());
        }
        Ok(())
    }
}
