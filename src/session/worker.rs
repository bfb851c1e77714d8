//! The serial queue: one OS thread owning the capture session, the bound
//! device and the focus ramp. Every mutation arrives as a [`Command`].

use super::capture::CapturedImage;
use super::focus::{FocusTarget, ManualFocusRamp};
use super::pipeline::{CaptureSession, DeviceLock};
use super::{SessionOptions, TapCallback};
use crate::errors::CameraError;
use crate::orientation::video_orientation_for;
use crate::platform::{
    CaptureDevice, PreviewLayer, PreviewSurface, StillImageCompletion, UiDispatcher,
};
use crate::types::{
    AutoFocusRangeRestriction, DevicePosition, FlashMode, FocusMode, InterfaceOrientation,
    MediaType, SessionSnapshot, SessionState, TapPoint, TorchMode, VideoGravity, VideoOrientation,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CameraError>>;

pub(crate) enum Command {
    Initialize { reply: Reply<()> },
    Start { reply: Reply<()> },
    Stop { reply: Reply<()> },
    SetPosition { position: DevicePosition, reply: Reply<()> },
    SwitchPosition { reply: Reply<DevicePosition> },
    HasFlash { reply: Reply<bool> },
    HasTorch { reply: Reply<bool> },
    ToggleFlash { reply: Reply<bool> },
    ToggleTorch { reply: Reply<bool> },
    Capture { reply: Reply<CapturedImage> },
    FocusTap { point: TapPoint, reply: Reply<()> },
    SetTapCallback { callback: Option<TapCallback>, reply: Reply<()> },
    SetManualFocus { enabled: bool, reply: Reply<()> },
    OrientationChanged {
        orientation: InterfaceOrientation,
        reply: Reply<Option<VideoOrientation>>,
    },
    Snapshot { reply: Reply<SessionSnapshot> },
    RampTick { generation: u64 },
}

pub(crate) struct SessionWorker {
    session: CaptureSession,
    device: Option<Box<dyn CaptureDevice>>,
    desired_position: DevicePosition,
    state: SessionState,
    surface: Arc<dyn PreviewSurface>,
    preview: Option<PreviewLayer>,
    video_orientation: Option<VideoOrientation>,
    dispatcher: Arc<dyn UiDispatcher>,
    tap_callback: Option<TapCallback>,
    manual_focus: bool,
    restrict_range_on_bind: bool,
    ramp: ManualFocusRamp,
    session_token: CancellationToken,
    runtime: Handle,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl SessionWorker {
    pub(crate) fn new(
        session: CaptureSession,
        surface: Arc<dyn PreviewSurface>,
        dispatcher: Arc<dyn UiDispatcher>,
        options: &SessionOptions,
        runtime: Handle,
        commands: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            session,
            device: None,
            desired_position: options.initial_position,
            state: SessionState::Uninitialized,
            surface,
            preview: None,
            video_orientation: None,
            dispatcher,
            tap_callback: None,
            manual_focus: options.manual_focus,
            restrict_range_on_bind: options.restrict_range_on_bind,
            ramp: ManualFocusRamp::new(options.ramp_step, options.ramp_interval),
            session_token: CancellationToken::new(),
            runtime,
            commands,
        }
    }

    /// Drain the queue until every controller handle is gone
    pub(crate) fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        log::debug!("Session queue started on backend {}", self.session.backend_name());
        while let Some(command) = rx.blocking_recv() {
            self.handle(command);
        }
        self.teardown();
        log::debug!("Session queue finished");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Initialize { reply } => {
                let _ = reply.send(self.initialize());
            }
            Command::Start { reply } => {
                let _ = reply.send(self.start());
            }
            Command::Stop { reply } => {
                self.stop();
                let _ = reply.send(Ok(()));
            }
            Command::SetPosition { position, reply } => {
                self.desired_position = position;
                let _ = reply.send(self.rebind());
            }
            Command::SwitchPosition { reply } => {
                self.desired_position = self.desired_position.flipped();
                let position = self.desired_position;
                let _ = reply.send(self.rebind().map(|_| position));
            }
            Command::HasFlash { reply } => {
                let has = self.device.as_ref().is_some_and(|d| d.capabilities().has_flash);
                let _ = reply.send(Ok(has));
            }
            Command::HasTorch { reply } => {
                let has = self.device.as_ref().is_some_and(|d| d.capabilities().has_torch);
                let _ = reply.send(Ok(has));
            }
            Command::ToggleFlash { reply } => {
                let _ = reply.send(self.toggle_flash());
            }
            Command::ToggleTorch { reply } => {
                let _ = reply.send(self.toggle_torch());
            }
            Command::Capture { reply } => self.capture(reply),
            Command::FocusTap { point, reply } => {
                let _ = reply.send(self.focus_tap(point));
            }
            Command::SetTapCallback { callback, reply } => {
                self.tap_callback = callback;
                let _ = reply.send(Ok(()));
            }
            Command::SetManualFocus { enabled, reply } => {
                self.set_manual_focus(enabled);
                let _ = reply.send(Ok(()));
            }
            Command::OrientationChanged { orientation, reply } => {
                let _ = reply.send(Ok(self.orientation_changed(orientation)));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Command::RampTick { generation } => self.ramp_tick(generation),
        }
    }

    // Lifecycle

    fn initialize(&mut self) -> Result<(), CameraError> {
        log::info!("Initializing camera session ({} camera)", self.desired_position);
        let device = self.prepare_device()?;

        let mut bracket = self.session.configure();
        bracket.add_input(&*device)?;
        bracket.add_still_image_output()?;
        bracket.commit();

        log::info!("Bound {} ({})", device.name(), device.position());
        self.device = Some(device);
        self.surface.register_tap_target();
        self.state = SessionState::Configured;
        Ok(())
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if self.preview.is_none() {
            let layer = PreviewLayer {
                gravity: VideoGravity::ResizeAspectFill,
                frame: self.surface.bounds(),
            };
            self.surface.attach_preview(&layer);
            self.preview = Some(layer);
        }

        if self.session_token.is_cancelled() {
            self.session_token = CancellationToken::new();
        }
        self.session.start_running()?;
        self.state = SessionState::Running;
        log::info!("Camera session running");
        Ok(())
    }

    fn stop(&mut self) {
        self.session_token.cancel();
        self.ramp.cancel();
        if self.session.is_running() {
            self.session.stop_running();
            log::info!("Camera session stopped");
        }
        if self.state == SessionState::Running {
            self.state = SessionState::Stopped;
        }
    }

    fn teardown(&mut self) {
        self.stop();
        if self.device.is_some() {
            let mut bracket = self.session.configure();
            bracket.remove_input();
            bracket.commit();
            self.device = None;
        }
    }

    // Device binding

    /// Enumerate video devices, pick the one at the desired position (or the
    /// first one) and apply the initial focus configuration
    fn prepare_device(&mut self) -> Result<Box<dyn CaptureDevice>, CameraError> {
        let devices = self.session.devices(MediaType::Video)?;
        let index = devices
            .iter()
            .position(|d| d.position() == self.desired_position)
            .unwrap_or(0);
        let mut device = devices
            .into_iter()
            .nth(index)
            .ok_or(CameraError::NoCameraAvailable)?;

        if device.position() != self.desired_position {
            log::warn!(
                "No {} camera, falling back to {}",
                self.desired_position,
                device.name()
            );
        }

        let caps = device.capabilities();
        let mut locked = DeviceLock::acquire(&mut *device)?;
        if caps.supports_focus_mode(FocusMode::ContinuousAutoFocus) {
            locked.set_focus_mode(FocusMode::ContinuousAutoFocus);
        }
        if self.restrict_range_on_bind && caps.supports_auto_focus_range_restriction {
            locked.set_auto_focus_range_restriction(AutoFocusRangeRestriction::Near);
        }
        drop(locked);

        Ok(device)
    }

    /// Replace the bound device with one at the desired position. The old
    /// input is removed before the new one is added, inside one bracket. If
    /// the new input is refused the old one is bound again.
    fn rebind(&mut self) -> Result<(), CameraError> {
        let device = self.prepare_device()?;
        let previous = self.device.take();

        let mut bracket = self.session.configure();
        bracket.remove_input();
        match bracket.add_input(&*device) {
            Ok(()) => {
                bracket.commit();
                log::info!("Switched to {} ({})", device.name(), device.position());
                self.device = Some(device);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to bind {}: {}", device.name(), e);
                let restored = previous.filter(|old| match bracket.add_input(&**old) {
                    Ok(()) => true,
                    Err(restore) => {
                        log::error!("Failed to restore {}: {}", old.name(), restore);
                        false
                    }
                });
                bracket.commit();
                self.device = restored;
                Err(e)
            }
        }
    }

    // Flash and torch

    fn toggle_flash(&mut self) -> Result<bool, CameraError> {
        let Some(bound) = self.device.as_mut() else {
            return Ok(false);
        };
        if !bound.capabilities().has_flash {
            return Ok(false);
        }

        let bracket = self.session.configure();
        let mut device = DeviceLock::acquire(&mut **bound)?;
        match device.flash_mode() {
            FlashMode::Off => device.set_flash_mode(FlashMode::On),
            FlashMode::On => device.set_flash_mode(FlashMode::Off),
            FlashMode::Auto => {}
        }
        let on = device.flash_mode() == FlashMode::On;
        drop(device);
        bracket.commit();

        log::debug!("Flash {}", if on { "on" } else { "off" });
        Ok(on)
    }

    fn toggle_torch(&mut self) -> Result<bool, CameraError> {
        let Some(bound) = self.device.as_mut() else {
            return Ok(false);
        };
        if !bound.capabilities().has_torch {
            return Ok(false);
        }

        let bracket = self.session.configure();
        let mut device = DeviceLock::acquire(&mut **bound)?;
        match device.torch_mode() {
            TorchMode::Off => device.set_torch_mode(TorchMode::On),
            TorchMode::On => device.set_torch_mode(TorchMode::Off),
            TorchMode::Auto => {}
        }
        let on = device.torch_mode() == TorchMode::On;
        drop(device);
        bracket.commit();

        log::debug!("Torch {}", if on { "on" } else { "off" });
        Ok(on)
    }

    // Capture

    fn capture(&mut self, reply: Reply<CapturedImage>) {
        let Some(connection) = self.session.video_connection() else {
            log::warn!("Capture requested without a video connection");
            let _ = reply.send(Err(CameraError::NoVideoConnection));
            return;
        };

        let runtime = self.runtime.clone();
        let completion: StillImageCompletion = Box::new(move |result| {
            runtime.spawn_blocking(move || {
                let outcome = result.and_then(CapturedImage::decode);
                if let Err(e) = &outcome {
                    log::error!("Still capture failed: {}", e);
                }
                let _ = reply.send(outcome);
            });
        });
        log::debug!("Requesting still image on connection {}", connection.id);
        self.session.capture_still_image(&connection, completion);
    }

    // Focus

    fn focus_tap(&mut self, point: TapPoint) -> Result<(), CameraError> {
        let result = self.apply_focus(point);

        if let Some(callback) = &self.tap_callback {
            let callback = callback.clone();
            self.dispatcher.dispatch(Box::new(move || callback(point)));
        }
        result
    }

    fn apply_focus(&mut self, point: TapPoint) -> Result<(), CameraError> {
        let target = FocusTarget::from_tap(point, self.surface.bounds());
        let Some(bound) = self.device.as_mut() else {
            log::debug!("Focus tap ignored, no device bound");
            return Ok(());
        };
        let caps = bound.capabilities();
        let mut device = DeviceLock::acquire(&mut **bound)?;

        match target {
            Some(target) if caps.supports_focus_point_of_interest => {
                device.set_focus_point_of_interest(target)
            }
            Some(_) => log::warn!("Focus point of interest not supported"),
            None => log::warn!("Preview surface has no area, focus point skipped"),
        }

        let start_ramp = if self.manual_focus {
            if caps.supports_focus_mode(FocusMode::Locked) {
                device.set_focus_mode(FocusMode::Locked);
            } else {
                log::warn!("Locked focus not supported");
            }
            !self.ramp.is_active()
        } else {
            if caps.supports_focus_mode(FocusMode::ContinuousAutoFocus) {
                device.set_focus_mode(FocusMode::ContinuousAutoFocus);
            } else if caps.supports_focus_mode(FocusMode::AutoFocus) {
                device.set_focus_mode(FocusMode::AutoFocus);
            } else {
                log::warn!("Auto focus not supported");
            }
            false
        };

        if caps.supports_auto_focus_range_restriction {
            device.set_auto_focus_range_restriction(AutoFocusRangeRestriction::None);
        } else {
            log::warn!("Auto focus range restriction not supported");
        }
        drop(device);

        if start_ramp {
            self.start_ramp();
        }
        Ok(())
    }

    fn set_manual_focus(&mut self, enabled: bool) {
        if self.manual_focus == enabled {
            return;
        }
        self.manual_focus = enabled;
        if !enabled {
            self.ramp.cancel();
        }
        log::info!("Manual focus {}", if enabled { "enabled" } else { "disabled" });
    }

    fn start_ramp(&mut self) {
        // A stopped session leaves its token cancelled; children of it would
        // be born cancelled and the first step would be lost.
        if self.session_token.is_cancelled() {
            self.session_token = CancellationToken::new();
        }
        let token = self.session_token.child_token();
        let generation = self.ramp.arm(token.clone());
        log::debug!("Starting manual focus ramp (generation {})", generation);
        spawn_ramp_timer(
            &self.runtime,
            self.commands.clone(),
            token,
            generation,
            self.ramp.interval(),
        );
    }

    fn ramp_tick(&mut self, generation: u64) {
        if !self.ramp.accepts(generation) {
            return;
        }

        let position = self.ramp.advance();
        if let Some(bound) = self.device.as_mut() {
            match DeviceLock::acquire(&mut **bound) {
                Ok(mut device) => device.set_focus_mode_locked_with_lens_position(position),
                Err(e) => log::warn!("Lens ramp step skipped: {}", e),
            }
        }

        if !self.session.is_running() {
            log::debug!("Session not running, manual focus ramp ends");
            self.ramp.cancel();
        }
    }

    // Preview

    fn orientation_changed(
        &mut self,
        orientation: InterfaceOrientation,
    ) -> Option<VideoOrientation> {
        self.preview.as_ref()?;
        if !self.surface.supports_video_orientation() {
            return None;
        }
        let video = video_orientation_for(orientation);
        if self.video_orientation != Some(video) {
            self.surface.set_video_orientation(video);
            self.video_orientation = Some(video);
        }
        Some(video)
    }

    fn snapshot(&self) -> SessionSnapshot {
        let device = self.device.as_deref();
        SessionSnapshot {
            state: self.state,
            desired_position: self.desired_position,
            bound_position: device.map(|d| d.position()),
            bound_device_id: self.session.input_id().map(str::to_string),
            input_count: self.session.input_count(),
            output_count: self.session.output_count(),
            flash_mode: device.map(|d| d.flash_mode()),
            torch_mode: device.map(|d| d.torch_mode()),
            focus_mode: device.map(|d| d.focus_mode()),
            range_restriction: device.map(|d| d.auto_focus_range_restriction()),
            device_lens_position: device.map(|d| d.lens_position()),
            lens_position: self.ramp.lens_position(),
            manual_focus: self.manual_focus,
            ramp_active: self.ramp.is_active(),
            preview_attached: self.preview.is_some(),
            video_orientation: self.video_orientation,
        }
    }
}

/// Feed ramp ticks into the queue: one immediately, then one per interval,
/// until the token is cancelled or the queue is gone
fn spawn_ramp_timer(
    runtime: &Handle,
    commands: mpsc::WeakUnboundedSender<Command>,
    token: CancellationToken,
    generation: u64,
    interval: Duration,
) {
    runtime.spawn(async move {
        loop {
            let Some(tx) = commands.upgrade() else {
                break;
            };
            if tx.send(Command::RampTick { generation }).is_err() {
                break;
            }
            drop(tx);

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });
}
