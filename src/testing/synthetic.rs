//! Offline capture platform
//!
//! Models a phone-style camera stack (rear camera with flash, torch and full
//! focus control, front camera without flash) and records how the session
//! drives it: bracket nesting, input counts, mutations made without the
//! device lock. Handles are cheap clones sharing one state, so a test can
//! keep a clone while the controller owns another.

use crate::errors::CameraError;
use crate::platform::{
    CaptureBackend, CaptureConnection, CaptureDevice, ImageCodec, PreviewLayer, PreviewSurface,
    StillImageCompletion,
};
use crate::session::FocusTarget;
use crate::types::{
    AutoFocusRangeRestriction, DeviceCapabilities, DevicePosition, FlashMode, FocusMode,
    MediaType, SessionPreset, SurfaceBounds, TorchMode, VideoOrientation,
};
use bytes::Bytes;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Build a JPEG with a gradient that varies per frame
pub fn synthetic_jpeg(frame_number: u64, width: u32, height: u32) -> Bytes {
    let base = (frame_number % 256) as u8;
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            base.wrapping_add((x % 256) as u8),
            base.wrapping_add((y % 256) as u8),
            base.wrapping_add(((x + y) % 256) as u8),
        ])
    });

    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
        .expect("in-memory JPEG encoding");
    Bytes::from(encoded)
}

/// What the still-image output hands back
#[derive(Debug, Clone, PartialEq)]
pub enum StillBehavior {
    /// A decodable JPEG of the given size
    Jpeg { width: u32, height: u32 },
    /// Bytes that are not an image
    Corrupt,
    /// Platform-level capture error
    Fail,
    /// Completion is dropped without being called
    Drop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDeviceSpec {
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
    pub capabilities: DeviceCapabilities,
}

impl SyntheticDeviceSpec {
    pub fn rear() -> Self {
        Self {
            id: "synthetic-back".to_string(),
            name: "Synthetic Back Camera".to_string(),
            position: DevicePosition::Back,
            capabilities: DeviceCapabilities::full(),
        }
    }

    pub fn front() -> Self {
        Self {
            id: "synthetic-front".to_string(),
            name: "Synthetic Front Camera".to_string(),
            position: DevicePosition::Front,
            capabilities: DeviceCapabilities {
                has_flash: false,
                has_torch: false,
                supports_locked_focus: false,
                supports_auto_focus: true,
                supports_continuous_auto_focus: false,
                supports_focus_point_of_interest: false,
                supports_auto_focus_range_restriction: false,
            },
        }
    }
}

/// Observable state of one synthetic device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub locked: bool,
    pub lock_count: u32,
    pub fail_lock: bool,
    /// Property writes made while not holding the configuration lock
    pub unlocked_mutations: u32,
    pub flash_mode: FlashMode,
    pub torch_mode: TorchMode,
    pub focus_mode: FocusMode,
    pub focus_point: Option<FocusTarget>,
    pub range_restriction: AutoFocusRangeRestriction,
    pub lens_position: f32,
    pub lens_updates: u32,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            locked: false,
            lock_count: 0,
            fail_lock: false,
            unlocked_mutations: 0,
            flash_mode: FlashMode::Off,
            torch_mode: TorchMode::Off,
            focus_mode: FocusMode::AutoFocus,
            focus_point: None,
            range_restriction: AutoFocusRangeRestriction::None,
            lens_position: 0.0,
            lens_updates: 0,
        }
    }
}

/// Counters describing how the session used the backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendStats {
    pub preset: Option<SessionPreset>,
    pub open_brackets: u32,
    pub commits: u32,
    /// Input or output changes made outside a bracket
    pub unbracketed_mutations: u32,
    pub inputs: Vec<String>,
    pub max_inputs: usize,
    pub outputs: usize,
    pub running: bool,
    pub start_calls: u32,
    pub stop_calls: u32,
    pub captures: u32,
}

struct BackendState {
    devices: Vec<(SyntheticDeviceSpec, Arc<Mutex<DeviceState>>)>,
    stats: BackendStats,
    connection_media: Vec<MediaType>,
    still: StillBehavior,
    frame_counter: u64,
    /// Positions whose devices the session refuses as inputs
    rejected_inputs: Vec<DevicePosition>,
}

#[derive(Clone)]
pub struct SyntheticBackend {
    state: Arc<Mutex<BackendState>>,
}

impl SyntheticBackend {
    pub fn new(specs: Vec<SyntheticDeviceSpec>) -> Self {
        let devices = specs
            .into_iter()
            .map(|spec| (spec, Arc::new(Mutex::new(DeviceState::default()))))
            .collect();
        Self {
            state: Arc::new(Mutex::new(BackendState {
                devices,
                stats: BackendStats::default(),
                connection_media: vec![MediaType::Video],
                still: StillBehavior::Jpeg {
                    width: 64,
                    height: 48,
                },
                frame_counter: 0,
                rejected_inputs: Vec::new(),
            })),
        }
    }

    /// Rear and front camera, rear first
    pub fn phone() -> Self {
        Self::new(vec![SyntheticDeviceSpec::rear(), SyntheticDeviceSpec::front()])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn boxed(&self) -> Box<dyn CaptureBackend> {
        Box::new(self.clone())
    }

    /// Media types on the still output's connection ports
    pub fn set_connection_media(&self, media: Vec<MediaType>) {
        self.lock().connection_media = media;
    }

    pub fn set_still_behavior(&self, behavior: StillBehavior) {
        self.lock().still = behavior;
    }

    pub fn set_fail_lock(&self, position: DevicePosition, fail: bool) {
        if let Some(device) = self.device_handle(position) {
            device.lock().expect("lock poisoned").fail_lock = fail;
        }
    }

    /// Make `add_input` fail for the device at `position`
    pub fn set_reject_input(&self, position: DevicePosition, reject: bool) {
        let mut state = self.lock();
        state.rejected_inputs.retain(|p| *p != position);
        if reject {
            state.rejected_inputs.push(position);
        }
    }

    pub fn set_flash_mode(&self, position: DevicePosition, mode: FlashMode) {
        if let Some(device) = self.device_handle(position) {
            device.lock().expect("lock poisoned").flash_mode = mode;
        }
    }

    pub fn stats(&self) -> BackendStats {
        self.lock().stats.clone()
    }

    pub fn device_state(&self, position: DevicePosition) -> Option<DeviceState> {
        self.device_handle(position)
            .map(|d| d.lock().expect("lock poisoned").clone())
    }

    fn device_handle(&self, position: DevicePosition) -> Option<Arc<Mutex<DeviceState>>> {
        self.lock()
            .devices
            .iter()
            .find(|(spec, _)| spec.position == position)
            .map(|(_, state)| state.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().expect("lock poisoned")
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn devices(
        &mut self,
        media: MediaType,
    ) -> Result<Vec<Box<dyn CaptureDevice>>, CameraError> {
        if media != MediaType::Video {
            return Ok(Vec::new());
        }
        Ok(self
            .lock()
            .devices
            .iter()
            .map(|(spec, state)| {
                Box::new(SyntheticDevice {
                    spec: spec.clone(),
                    state: state.clone(),
                    holds_lock: false,
                }) as Box<dyn CaptureDevice>
            })
            .collect())
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        self.lock().stats.preset = Some(preset);
    }

    fn begin_configuration(&mut self) {
        self.lock().stats.open_brackets += 1;
    }

    fn commit_configuration(&mut self) {
        let mut state = self.lock();
        state.stats.open_brackets = state.stats.open_brackets.saturating_sub(1);
        state.stats.commits += 1;
    }

    fn can_add_input(&self, device: &dyn CaptureDevice) -> bool {
        !self
            .lock()
            .stats
            .inputs
            .iter()
            .any(|id| id == device.unique_id())
    }

    fn add_input(&mut self, device: &dyn CaptureDevice) -> Result<(), CameraError> {
        let mut state = self.lock();
        if state.stats.open_brackets == 0 {
            state.stats.unbracketed_mutations += 1;
        }
        if state.rejected_inputs.contains(&device.position()) {
            return Err(CameraError::InitializationError(format!(
                "Input {} rejected",
                device.unique_id()
            )));
        }
        state.stats.inputs.push(device.unique_id().to_string());
        state.stats.max_inputs = state.stats.max_inputs.max(state.stats.inputs.len());
        Ok(())
    }

    fn remove_input(&mut self, device_id: &str) {
        let mut state = self.lock();
        if state.stats.open_brackets == 0 {
            state.stats.unbracketed_mutations += 1;
        }
        state.stats.inputs.retain(|id| id != device_id);
    }

    fn add_still_image_output(&mut self, _codec: ImageCodec) -> Result<(), CameraError> {
        let mut state = self.lock();
        if state.stats.open_brackets == 0 {
            state.stats.unbracketed_mutations += 1;
        }
        state.stats.outputs += 1;
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        let mut state = self.lock();
        state.stats.start_calls += 1;
        state.stats.running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        let mut state = self.lock();
        state.stats.stop_calls += 1;
        state.stats.running = false;
    }

    fn is_running(&self) -> bool {
        self.lock().stats.running
    }

    fn output_connections(&self) -> Vec<CaptureConnection> {
        let state = self.lock();
        if state.stats.outputs == 0 || state.stats.inputs.is_empty() {
            return Vec::new();
        }
        vec![CaptureConnection {
            id: 1,
            input_ports: state.connection_media.clone(),
        }]
    }

    fn capture_still_image(
        &mut self,
        _connection: &CaptureConnection,
        completion: StillImageCompletion,
    ) {
        let (behavior, frame) = {
            let mut state = self.lock();
            state.stats.captures += 1;
            state.frame_counter += 1;
            (state.still.clone(), state.frame_counter)
        };

        match behavior {
            StillBehavior::Jpeg { width, height } => {
                completion(Ok(synthetic_jpeg(frame, width, height)))
            }
            StillBehavior::Corrupt => completion(Ok(Bytes::from_static(b"\xff\xd8 truncated"))),
            StillBehavior::Fail => completion(Err(CameraError::CaptureError(
                "synthetic capture failure".to_string(),
            ))),
            StillBehavior::Drop => drop(completion),
        }
    }
}

/// Handle to one synthetic camera
pub struct SyntheticDevice {
    spec: SyntheticDeviceSpec,
    state: Arc<Mutex<DeviceState>>,
    holds_lock: bool,
}

impl SyntheticDevice {
    fn mutate(&mut self, f: impl FnOnce(&mut DeviceState)) {
        let mut state = self.state.lock().expect("lock poisoned");
        if !self.holds_lock {
            state.unlocked_mutations += 1;
        }
        f(&mut *state);
    }

    fn read<T>(&self, f: impl FnOnce(&DeviceState) -> T) -> T {
        f(&*self.state.lock().expect("lock poisoned"))
    }
}

impl CaptureDevice for SyntheticDevice {
    fn unique_id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn position(&self) -> DevicePosition {
        self.spec.position
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.spec.capabilities
    }

    fn lock_for_configuration(&mut self) -> Result<(), CameraError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.fail_lock {
            return Err(CameraError::ConfigurationLockFailed(format!(
                "{} is busy",
                self.spec.name
            )));
        }
        if state.locked {
            return Err(CameraError::ConfigurationLockFailed(format!(
                "{} is already locked",
                self.spec.name
            )));
        }
        state.locked = true;
        state.lock_count += 1;
        self.holds_lock = true;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        if self.holds_lock {
            self.state.lock().expect("lock poisoned").locked = false;
            self.holds_lock = false;
        }
    }

    fn flash_mode(&self) -> FlashMode {
        self.read(|s| s.flash_mode)
    }

    fn set_flash_mode(&mut self, mode: FlashMode) {
        self.mutate(|s| s.flash_mode = mode);
    }

    fn torch_mode(&self) -> TorchMode {
        self.read(|s| s.torch_mode)
    }

    fn set_torch_mode(&mut self, mode: TorchMode) {
        self.mutate(|s| s.torch_mode = mode);
    }

    fn focus_mode(&self) -> FocusMode {
        self.read(|s| s.focus_mode)
    }

    fn set_focus_mode(&mut self, mode: FocusMode) {
        self.mutate(|s| s.focus_mode = mode);
    }

    fn set_focus_point_of_interest(&mut self, target: FocusTarget) {
        self.mutate(|s| s.focus_point = Some(target));
    }

    fn auto_focus_range_restriction(&self) -> AutoFocusRangeRestriction {
        self.read(|s| s.range_restriction)
    }

    fn set_auto_focus_range_restriction(&mut self, restriction: AutoFocusRangeRestriction) {
        self.mutate(|s| s.range_restriction = restriction);
    }

    fn lens_position(&self) -> f32 {
        self.read(|s| s.lens_position)
    }

    fn set_focus_mode_locked_with_lens_position(&mut self, position: f32) {
        self.mutate(|s| {
            s.focus_mode = FocusMode::Locked;
            s.lens_position = position;
            s.lens_updates += 1;
        });
    }
}

/// Preview surface that records what the session did to it
pub struct SyntheticSurface {
    bounds: Mutex<SurfaceBounds>,
    supports_orientation: bool,
    tap_registered: Mutex<bool>,
    layers: Mutex<Vec<PreviewLayer>>,
    orientation_updates: Mutex<Vec<VideoOrientation>>,
}

impl SyntheticSurface {
    pub fn new(bounds: SurfaceBounds) -> Self {
        Self {
            bounds: Mutex::new(bounds),
            supports_orientation: true,
            tap_registered: Mutex::new(false),
            layers: Mutex::new(Vec::new()),
            orientation_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn without_orientation_support(mut self) -> Self {
        self.supports_orientation = false;
        self
    }

    pub fn set_bounds(&self, bounds: SurfaceBounds) {
        *self.bounds.lock().expect("lock poisoned") = bounds;
    }

    pub fn tap_registered(&self) -> bool {
        *self.tap_registered.lock().expect("lock poisoned")
    }

    pub fn attached_layers(&self) -> Vec<PreviewLayer> {
        self.layers.lock().expect("lock poisoned").clone()
    }

    pub fn orientation_updates(&self) -> Vec<VideoOrientation> {
        self.orientation_updates.lock().expect("lock poisoned").clone()
    }
}

impl PreviewSurface for SyntheticSurface {
    fn bounds(&self) -> SurfaceBounds {
        *self.bounds.lock().expect("lock poisoned")
    }

    fn register_tap_target(&self) {
        *self.tap_registered.lock().expect("lock poisoned") = true;
    }

    fn attach_preview(&self, layer: &PreviewLayer) {
        self.layers.lock().expect("lock poisoned").push(layer.clone());
    }

    fn supports_video_orientation(&self) -> bool {
        self.supports_orientation
    }

    fn set_video_orientation(&self, orientation: VideoOrientation) {
        self.orientation_updates
            .lock()
            .expect("lock poisoned")
            .push(orientation);
    }
}
