//! Core value types shared by the session controller, the platform layer and
//! the Tauri commands.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Facing position of a physical camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    Back,
    Front,
}

impl DevicePosition {
    /// The opposite facing position
    pub fn flipped(self) -> Self {
        match self {
            DevicePosition::Back => DevicePosition::Front,
            DevicePosition::Front => DevicePosition::Back,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePosition::Back => "back",
            DevicePosition::Front => "front",
        }
    }
}

impl Default for DevicePosition {
    fn default() -> Self {
        DevicePosition::Back
    }
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" | "rear" => Ok(DevicePosition::Back),
            "front" | "user" => Ok(DevicePosition::Front),
            other => Err(format!("Unknown device position: {}", other)),
        }
    }
}

/// Media carried by a capture port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashMode {
    Off,
    On,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorchMode {
    Off,
    On,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMode {
    /// Lens held at a fixed position
    Locked,
    /// Single-shot auto focus
    AutoFocus,
    ContinuousAutoFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoFocusRangeRestriction {
    None,
    Near,
}

/// What a device is able to do. Absence of a capability is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub has_flash: bool,
    pub has_torch: bool,
    pub supports_locked_focus: bool,
    pub supports_auto_focus: bool,
    pub supports_continuous_auto_focus: bool,
    pub supports_focus_point_of_interest: bool,
    pub supports_auto_focus_range_restriction: bool,
}

impl DeviceCapabilities {
    /// Capabilities of a typical phone rear camera
    pub fn full() -> Self {
        Self {
            has_flash: true,
            has_torch: true,
            supports_locked_focus: true,
            supports_auto_focus: true,
            supports_continuous_auto_focus: true,
            supports_focus_point_of_interest: true,
            supports_auto_focus_range_restriction: true,
        }
    }

    pub fn supports_focus_mode(&self, mode: FocusMode) -> bool {
        match mode {
            FocusMode::Locked => self.supports_locked_focus,
            FocusMode::AutoFocus => self.supports_auto_focus,
            FocusMode::ContinuousAutoFocus => self.supports_continuous_auto_focus,
        }
    }
}

/// Rectangle of the preview surface in its own coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Raw tap location in preview-surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TapPoint {
    pub x: f64,
    pub y: f64,
}

impl TapPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Orientation of the host user interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceOrientation {
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// Orientation applied to the preview video connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoGravity {
    ResizeAspectFill,
}

/// Capture quality preset requested from the platform session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPreset {
    Photo,
}

/// Top-level session lifecycle.
///
/// `Uninitialized` is only observable before `initialize` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Configured,
    Running,
    Stopped,
}

/// Read-only view of the session taken on the serial queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub desired_position: DevicePosition,
    pub bound_position: Option<DevicePosition>,
    pub bound_device_id: Option<String>,
    pub input_count: usize,
    pub output_count: usize,
    pub flash_mode: Option<FlashMode>,
    pub torch_mode: Option<TorchMode>,
    pub focus_mode: Option<FocusMode>,
    pub range_restriction: Option<AutoFocusRangeRestriction>,
    /// Lens position last applied to the bound device
    pub device_lens_position: Option<f32>,
    /// Lens position of the manual focus ramp
    pub lens_position: f32,
    pub manual_focus: bool,
    pub ramp_active: bool,
    pub preview_attached: bool,
    pub video_orientation: Option<VideoOrientation>,
}

/// Summary of an enumerable device, used by the CLI and Tauri commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDeviceInfo {
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
    pub capabilities: DeviceCapabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_flip() {
        assert_eq!(DevicePosition::Back.flipped(), DevicePosition::Front);
        assert_eq!(DevicePosition::Front.flipped().flipped(), DevicePosition::Front);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("Front".parse::<DevicePosition>().unwrap(), DevicePosition::Front);
        assert_eq!("rear".parse::<DevicePosition>().unwrap(), DevicePosition::Back);
        assert!("sideways".parse::<DevicePosition>().is_err());
    }

    #[test]
    fn test_position_serde_lowercase() {
        let json = serde_json::to_string(&DevicePosition::Front).unwrap();
        assert_eq!(json, "\"front\"");
    }

    #[test]
    fn test_empty_bounds() {
        assert!(SurfaceBounds::new(0.0, 100.0).is_empty());
        assert!(SurfaceBounds::new(f64::NAN, 100.0).is_empty());
        assert!(!SurfaceBounds::new(320.0, 480.0).is_empty());
    }

    #[test]
    fn test_capabilities_focus_modes() {
        let caps = DeviceCapabilities {
            supports_auto_focus: true,
            ..Default::default()
        };
        assert!(caps.supports_focus_mode(FocusMode::AutoFocus));
        assert!(!caps.supports_focus_mode(FocusMode::ContinuousAutoFocus));
        assert!(DeviceCapabilities::full().supports_focus_mode(FocusMode::Locked));
    }
}
