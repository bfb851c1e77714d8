//! Desktop capture backend over nokhwa
//!
//! Desktop webcams report no facing position, flash, torch or focus point
//! support, so devices from this backend expose empty capabilities and the
//! controller's capability-gated operations degrade to no-ops. Still images
//! are taken from the MJPEG stream, which already carries JPEG buffers.

use super::{CaptureBackend, CaptureConnection, CaptureDevice, ImageCodec, StillImageCompletion};
use crate::config::CaptureConfig;
use crate::errors::CameraError;
use crate::session::FocusTarget;
use crate::types::{
    AutoFocusRangeRestriction, CameraDeviceInfo, DeviceCapabilities, DevicePosition, FlashMode,
    FocusMode, MediaType, SessionPreset, TorchMode,
};
use bytes::Bytes;
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    CallbackCamera,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// List cameras visible to the native backend
pub fn list_cameras() -> Result<Vec<CameraDeviceInfo>, CameraError> {
    let cameras = query(ApiBackend::Auto)
        .map_err(|e| CameraError::InitializationError(format!("Failed to query cameras: {}", e)))?;

    Ok(cameras
        .into_iter()
        .map(|info| {
            let name = info.human_name();
            CameraDeviceInfo {
                id: info.index().to_string(),
                position: position_from_name(&name),
                name,
                capabilities: DeviceCapabilities::default(),
            }
        })
        .collect())
}

/// Guess the facing position from the device name. Anything not named as a
/// rear camera is treated as user-facing, which fits laptop webcams.
fn position_from_name(name: &str) -> DevicePosition {
    let lower = name.to_ascii_lowercase();
    if lower.contains("back") || lower.contains("rear") || lower.contains("world") {
        DevicePosition::Back
    } else {
        DevicePosition::Front
    }
}

/// Webcam handle as enumerated; holds mode values locally since the hardware
/// has nothing to apply them to
pub struct DesktopDevice {
    info: CameraDeviceInfo,
    locked: bool,
    flash_mode: FlashMode,
    torch_mode: TorchMode,
    focus_mode: FocusMode,
    range_restriction: AutoFocusRangeRestriction,
    lens_position: f32,
}

impl DesktopDevice {
    fn new(info: CameraDeviceInfo) -> Self {
        Self {
            info,
            locked: false,
            flash_mode: FlashMode::Off,
            torch_mode: TorchMode::Off,
            focus_mode: FocusMode::AutoFocus,
            range_restriction: AutoFocusRangeRestriction::None,
            lens_position: 0.0,
        }
    }
}

impl CaptureDevice for DesktopDevice {
    fn unique_id(&self) -> &str {
        &self.info.id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn position(&self) -> DevicePosition {
        self.info.position
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.info.capabilities
    }

    fn lock_for_configuration(&mut self) -> Result<(), CameraError> {
        if self.locked {
            return Err(CameraError::ConfigurationLockFailed(format!(
                "device {} is already locked",
                self.info.id
            )));
        }
        self.locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        self.locked = false;
    }

    fn flash_mode(&self) -> FlashMode {
        self.flash_mode
    }

    fn set_flash_mode(&mut self, mode: FlashMode) {
        self.flash_mode = mode;
    }

    fn torch_mode(&self) -> TorchMode {
        self.torch_mode
    }

    fn set_torch_mode(&mut self, mode: TorchMode) {
        self.torch_mode = mode;
    }

    fn focus_mode(&self) -> FocusMode {
        self.focus_mode
    }

    fn set_focus_mode(&mut self, mode: FocusMode) {
        self.focus_mode = mode;
    }

    fn set_focus_point_of_interest(&mut self, _target: FocusTarget) {}

    fn auto_focus_range_restriction(&self) -> AutoFocusRangeRestriction {
        self.range_restriction
    }

    fn set_auto_focus_range_restriction(&mut self, restriction: AutoFocusRangeRestriction) {
        self.range_restriction = restriction;
    }

    fn lens_position(&self) -> f32 {
        self.lens_position
    }

    fn set_focus_mode_locked_with_lens_position(&mut self, position: f32) {
        self.focus_mode = FocusMode::Locked;
        self.lens_position = position;
    }
}

/// nokhwa-backed capture session: one open camera per bound input
pub struct DesktopBackend {
    format: CaptureConfig,
    camera: Option<Arc<Mutex<CallbackCamera>>>,
    input: Option<String>,
    output: Option<ImageCodec>,
    running: bool,
    preset: SessionPreset,
}

impl DesktopBackend {
    pub fn new(format: CaptureConfig) -> Self {
        Self {
            format,
            camera: None,
            input: None,
            output: None,
            running: false,
            preset: SessionPreset::Photo,
        }
    }

    fn open_camera(&self, device_id: &str) -> Result<CallbackCamera, CameraError> {
        let device_index = device_id
            .parse::<u32>()
            .map_err(|_| CameraError::InitializationError("Invalid device ID".to_string()))?;

        let [width, height] = self.format.resolution;
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Exact(
            nokhwa::utils::CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                self.format.fps,
            ),
        ));

        CallbackCamera::new(CameraIndex::Index(device_index), requested_format, |_| {}).map_err(
            |e| CameraError::InitializationError(format!("Failed to initialize camera: {}", e)),
        )
    }

    fn grab_still(&self) -> Result<Bytes, CameraError> {
        let camera = self
            .camera
            .as_ref()
            .ok_or_else(|| CameraError::CaptureError("No camera bound".to_string()))?;
        let mut camera = camera
            .lock()
            .map_err(|_| CameraError::CaptureError("Failed to lock camera".to_string()))?;

        let frame = camera
            .poll_frame()
            .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;

        match frame.source_frame_format() {
            FrameFormat::MJPEG => Ok(Bytes::copy_from_slice(&frame.buffer_bytes())),
            FrameFormat::RAWRGB => {
                let resolution = frame.resolution();
                let rgb = image::RgbImage::from_raw(
                    resolution.width_x,
                    resolution.height_y,
                    frame.buffer_bytes().to_vec(),
                )
                .ok_or_else(|| CameraError::DecodeFailed("RGB buffer size mismatch".to_string()))?;
                let mut encoded = Vec::new();
                image::DynamicImage::ImageRgb8(rgb)
                    .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
                    .map_err(|e| CameraError::DecodeFailed(e.to_string()))?;
                Ok(Bytes::from(encoded))
            }
            other => Err(CameraError::CaptureError(format!(
                "Unsupported still frame format: {}",
                other
            ))),
        }
    }
}

impl CaptureBackend for DesktopBackend {
    fn name(&self) -> &str {
        "nokhwa"
    }

    fn devices(&mut self, media: MediaType) -> Result<Vec<Box<dyn CaptureDevice>>, CameraError> {
        if media != MediaType::Video {
            return Ok(Vec::new());
        }
        Ok(list_cameras()?
            .into_iter()
            .map(|info| Box::new(DesktopDevice::new(info)) as Box<dyn CaptureDevice>)
            .collect())
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        log::debug!("Desktop session preset: {:?}", preset);
        self.preset = preset;
    }

    // nokhwa applies changes eagerly; nothing to batch.
    fn begin_configuration(&mut self) {}

    fn commit_configuration(&mut self) {}

    fn can_add_input(&self, _device: &dyn CaptureDevice) -> bool {
        self.input.is_none()
    }

    fn add_input(&mut self, device: &dyn CaptureDevice) -> Result<(), CameraError> {
        let camera = self.open_camera(device.unique_id())?;
        self.camera = Some(Arc::new(Mutex::new(camera)));
        self.input = Some(device.unique_id().to_string());

        if self.running {
            self.running = false;
            self.start_running()?;
        }
        Ok(())
    }

    fn remove_input(&mut self, device_id: &str) {
        if self.input.as_deref() != Some(device_id) {
            return;
        }
        if let Some(camera) = self.camera.take() {
            if let Ok(mut camera) = camera.lock() {
                let _ = camera.stop_stream();
            }
        }
        self.input = None;
    }

    fn add_still_image_output(&mut self, codec: ImageCodec) -> Result<(), CameraError> {
        self.output = Some(codec);
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        if self.running {
            return Ok(());
        }
        if let Some(camera) = &self.camera {
            let mut camera = camera.lock().map_err(|_| {
                CameraError::InitializationError("Failed to lock camera".to_string())
            })?;
            camera.open_stream().map_err(|e| {
                CameraError::InitializationError(format!("Failed to start stream: {}", e))
            })?;
        }
        self.running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        if let Some(camera) = &self.camera {
            if let Ok(mut camera) = camera.lock() {
                if let Err(e) = camera.stop_stream() {
                    log::warn!("Failed to stop stream: {}", e);
                }
            }
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn output_connections(&self) -> Vec<CaptureConnection> {
        match (&self.input, &self.output) {
            (Some(_), Some(_)) => vec![CaptureConnection {
                id: 0,
                input_ports: vec![MediaType::Video],
            }],
            _ => Vec::new(),
        }
    }

    fn capture_still_image(
        &mut self,
        _connection: &CaptureConnection,
        completion: StillImageCompletion,
    ) {
        completion(self.grab_still());
    }
}

impl Drop for DesktopBackend {
    fn drop(&mut self) {
        if let Some(camera) = self.camera.take() {
            if let Ok(mut camera) = camera.lock() {
                let _ = camera.stop_stream();
            }
        }
    }
}

// The session thread is the only owner of the backend.
unsafe impl Send for DesktopBackend {}
