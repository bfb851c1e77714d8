//! Platform capture service seam
//!
//! The session controller never talks to a camera framework directly. It
//! drives a [`CaptureBackend`] (device enumeration, session inputs and
//! outputs, still capture), mutates [`CaptureDevice`]s under their
//! configuration lock, attaches its preview to a [`PreviewSurface`] and hands
//! UI-bound callbacks to a [`UiDispatcher`].

pub mod desktop;
pub mod dispatch;

use crate::errors::CameraError;
use crate::session::FocusTarget;
use crate::types::{
    AutoFocusRangeRestriction, DeviceCapabilities, DevicePosition, FlashMode, FocusMode,
    MediaType, SessionPreset, SurfaceBounds, TorchMode, VideoGravity, VideoOrientation,
};
use bytes::Bytes;

pub use desktop::DesktopBackend;
pub use dispatch::{InlineDispatcher, TokioDispatcher, UiDispatcher, UiJob};

/// Completion for a single still-image request. Called at most once; dropping
/// it without calling resolves the request as a capture failure.
pub type StillImageCompletion = Box<dyn FnOnce(Result<Bytes, CameraError>) + Send + 'static>;

/// Encoding requested from the still-image output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCodec {
    Jpeg,
}

/// Active data path of the still-image output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConnection {
    pub id: u32,
    /// Media types of the input ports feeding this connection
    pub input_ports: Vec<MediaType>,
}

impl CaptureConnection {
    pub fn carries(&self, media: MediaType) -> bool {
        self.input_ports.contains(&media)
    }
}

/// A physical camera endpoint.
///
/// Property setters must only be called between `lock_for_configuration` and
/// `unlock_for_configuration`; use [`crate::session::DeviceLock`].
pub trait CaptureDevice: Send {
    fn unique_id(&self) -> &str;
    fn name(&self) -> &str;
    fn position(&self) -> DevicePosition;
    fn capabilities(&self) -> DeviceCapabilities;

    fn lock_for_configuration(&mut self) -> Result<(), CameraError>;
    fn unlock_for_configuration(&mut self);

    fn flash_mode(&self) -> FlashMode;
    fn set_flash_mode(&mut self, mode: FlashMode);
    fn torch_mode(&self) -> TorchMode;
    fn set_torch_mode(&mut self, mode: TorchMode);

    fn focus_mode(&self) -> FocusMode;
    fn set_focus_mode(&mut self, mode: FocusMode);
    fn set_focus_point_of_interest(&mut self, target: FocusTarget);
    fn auto_focus_range_restriction(&self) -> AutoFocusRangeRestriction;
    fn set_auto_focus_range_restriction(&mut self, restriction: AutoFocusRangeRestriction);

    fn lens_position(&self) -> f32;
    /// Lock focus and move the lens; no completion is reported
    fn set_focus_mode_locked_with_lens_position(&mut self, position: f32);
}

/// The platform's capture session plus its device and output factories
pub trait CaptureBackend: Send {
    fn name(&self) -> &str;

    /// Enumerate devices producing `media`, in platform order
    fn devices(&mut self, media: MediaType) -> Result<Vec<Box<dyn CaptureDevice>>, CameraError>;

    fn set_preset(&mut self, preset: SessionPreset);
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);

    fn can_add_input(&self, device: &dyn CaptureDevice) -> bool;
    fn add_input(&mut self, device: &dyn CaptureDevice) -> Result<(), CameraError>;
    fn remove_input(&mut self, device_id: &str);
    fn add_still_image_output(&mut self, codec: ImageCodec) -> Result<(), CameraError>;

    fn start_running(&mut self) -> Result<(), CameraError>;
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;

    /// Connections of the still-image output
    fn output_connections(&self) -> Vec<CaptureConnection>;
    /// Request one still image on `connection`; `completion` receives the
    /// encoded buffer
    fn capture_still_image(
        &mut self,
        connection: &CaptureConnection,
        completion: StillImageCompletion,
    );
}

/// Live video layer attached to the preview surface
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewLayer {
    pub gravity: VideoGravity,
    pub frame: SurfaceBounds,
}

/// View the live feed is drawn into. Layout belongs to the host.
pub trait PreviewSurface: Send + Sync {
    fn bounds(&self) -> SurfaceBounds;

    /// Route taps on the surface to the controller's focus handler
    fn register_tap_target(&self) {}

    fn attach_preview(&self, layer: &PreviewLayer);

    fn supports_video_orientation(&self) -> bool {
        true
    }

    fn set_video_orientation(&self, orientation: VideoOrientation);
}
