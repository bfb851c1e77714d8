//! Camera session controller
//!
//! [`CameraSessionController`] is the caller-facing handle. It owns no camera
//! state itself: every operation is turned into a command on a dedicated
//! serial queue (a named OS thread) that owns the capture session, the bound
//! device and the manual focus ramp. Operations are submitted when called and
//! answer through a [`Pending`] future, so ordering always matches call order
//! whether or not the caller awaits.
//!
//! # Example
//! ```rust,no_run
//! use snapcrab::platform::DesktopBackend;
//! use snapcrab::session::CameraSessionController;
//! use snapcrab::testing::SyntheticSurface;
//! use snapcrab::types::{DevicePosition, SurfaceBounds};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), snapcrab::CameraError> {
//! let surface = Arc::new(SyntheticSurface::new(SurfaceBounds::new(1280.0, 720.0)));
//! let backend = Box::new(DesktopBackend::new(Default::default()));
//! let camera = CameraSessionController::initialize(backend, surface, DevicePosition::Back).await?;
//! camera.start().await?;
//! let photo = camera.capture().await?;
//! println!("{}x{}", photo.width(), photo.height());
//! # Ok(())
//! # }
//! ```

mod capture;
mod focus;
mod pipeline;
mod worker;

pub use capture::CapturedImage;
pub use focus::{FocusTarget, ManualFocusRamp};
pub use pipeline::{CaptureSession, ConfigurationBracket, DeviceLock};

use crate::config::SnapCrabConfig;
use crate::errors::CameraError;
use crate::platform::{CaptureBackend, PreviewSurface, TokioDispatcher, UiDispatcher};
use crate::types::{
    DevicePosition, InterfaceOrientation, SessionPreset, SessionSnapshot, TapPoint,
    VideoOrientation,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use worker::{Command, Reply, SessionWorker};

/// Observer for raw focus taps, run on the UI dispatcher
pub type TapCallback = Arc<dyn Fn(TapPoint) + Send + Sync + 'static>;

/// Settings applied when the session is created
#[derive(Clone)]
pub struct SessionOptions {
    pub initial_position: DevicePosition,
    pub manual_focus: bool,
    pub ramp_step: f32,
    pub ramp_interval: Duration,
    pub restrict_range_on_bind: bool,
    pub preset: SessionPreset,
    /// Scheduler for UI-bound callbacks; defaults to the current Tokio runtime
    pub dispatcher: Option<Arc<dyn UiDispatcher>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SnapCrabConfig::default())
    }
}

impl From<&SnapCrabConfig> for SessionOptions {
    fn from(config: &SnapCrabConfig) -> Self {
        Self {
            initial_position: config.session.initial_position,
            manual_focus: config.session.manual_focus,
            ramp_step: config.focus.ramp_step,
            ramp_interval: config.focus.ramp_interval(),
            restrict_range_on_bind: config.focus.restrict_range_on_bind,
            preset: SessionPreset::Photo,
            dispatcher: None,
        }
    }
}

impl SessionOptions {
    pub fn with_position(mut self, position: DevicePosition) -> Self {
        self.initial_position = position;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }
}

/// Result of an operation already submitted to the serial queue.
///
/// Dropping it does not withdraw the operation.
#[must_use = "the operation is queued either way; await to observe its result"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, CameraError>>,
    on_dropped: CameraError,
}

impl<T> Pending<T> {
    fn new(rx: oneshot::Receiver<Result<T, CameraError>>) -> Self {
        Self {
            rx,
            on_dropped: CameraError::SessionClosed,
        }
    }

    fn or_on_dropped(mut self, error: CameraError) -> Self {
        self.on_dropped = error;
        self
    }
}

impl<T> Unpin for Pending<T> {}

impl<T> Future for Pending<T> {
    type Output = Result<T, CameraError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(this.on_dropped.clone())),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Caller-facing handle to one camera session
pub struct CameraSessionController {
    commands: mpsc::UnboundedSender<Command>,
    dispatcher: Arc<dyn UiDispatcher>,
    runtime: Handle,
}

impl CameraSessionController {
    /// Create the session, bind the camera at `position` (or the first one
    /// enumerated) and attach a JPEG still-image output
    pub async fn initialize(
        backend: Box<dyn CaptureBackend>,
        surface: Arc<dyn PreviewSurface>,
        position: DevicePosition,
    ) -> Result<Self, CameraError> {
        let options = SessionOptions::default().with_position(position);
        Self::initialize_with(backend, surface, options).await
    }

    pub async fn initialize_with(
        backend: Box<dyn CaptureBackend>,
        surface: Arc<dyn PreviewSurface>,
        options: SessionOptions,
    ) -> Result<Self, CameraError> {
        let runtime = Handle::try_current().map_err(|e| {
            CameraError::InitializationError(format!("A Tokio runtime is required: {}", e))
        })?;
        let dispatcher: Arc<dyn UiDispatcher> = options
            .dispatcher
            .clone()
            .unwrap_or_else(|| Arc::new(TokioDispatcher::new(runtime.clone())));

        let (tx, rx) = mpsc::unbounded_channel();
        let session = CaptureSession::new(backend, options.preset);
        let worker = SessionWorker::new(
            session,
            surface,
            dispatcher.clone(),
            &options,
            runtime.clone(),
            tx.downgrade(),
        );

        std::thread::Builder::new()
            .name("snapcrab-session".to_string())
            .spawn(move || worker.run(rx))
            .map_err(|e| CameraError::InitializationError(format!("spawn failed: {}", e)))?;

        let controller = Self {
            commands: tx,
            dispatcher,
            runtime,
        };
        controller
            .request(|reply| Command::Initialize { reply })
            .await?;
        Ok(controller)
    }

    fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Pending<T> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(command(reply)).is_err() {
            log::debug!("Session queue closed, dropping command");
        }
        Pending::new(rx)
    }

    /// Attach the live preview and begin running. Starting a running session
    /// does nothing.
    pub fn start(&self) -> Pending<()> {
        self.request(|reply| Command::Start { reply })
    }

    /// Stop running and end any focus ramp. Never blocks.
    pub fn stop(&self) -> Pending<()> {
        self.request(|reply| Command::Stop { reply })
    }

    pub fn set_device_position(&self, position: DevicePosition) -> Pending<()> {
        self.request(|reply| Command::SetPosition { position, reply })
    }

    /// Flip between back and front cameras; resolves to the new position
    pub fn switch_position(&self) -> Pending<DevicePosition> {
        self.request(|reply| Command::SwitchPosition { reply })
    }

    pub fn has_flash(&self) -> Pending<bool> {
        self.request(|reply| Command::HasFlash { reply })
    }

    pub fn has_torch(&self) -> Pending<bool> {
        self.request(|reply| Command::HasTorch { reply })
    }

    /// Flip flash between off and on; resolves to whether flash is now on.
    /// Devices without flash resolve to `false` untouched.
    pub fn toggle_flash(&self) -> Pending<bool> {
        self.request(|reply| Command::ToggleFlash { reply })
    }

    pub fn toggle_torch(&self) -> Pending<bool> {
        self.request(|reply| Command::ToggleTorch { reply })
    }

    /// Take one still image. Never retried.
    pub fn capture(&self) -> Pending<CapturedImage> {
        self.request(|reply| Command::Capture { reply })
            .or_on_dropped(CameraError::CaptureError(
                "still image request was dropped".to_string(),
            ))
    }

    /// Take one still image and hand the outcome to `completion` on the UI
    /// dispatcher, exactly once
    pub fn capture_with<F>(&self, completion: F)
    where
        F: FnOnce(Result<CapturedImage, CameraError>) + Send + 'static,
    {
        let pending = self.capture();
        let dispatcher = self.dispatcher.clone();
        self.runtime.spawn(async move {
            let result = pending.await;
            dispatcher.dispatch(Box::new(move || completion(result)));
        });
    }

    /// Focus at a tap on the preview surface. The tap callback, if any, is
    /// notified with the raw point whether or not focusing succeeded.
    pub fn on_focus_tap(&self, point: TapPoint) -> Pending<()> {
        self.request(|reply| Command::FocusTap { point, reply })
    }

    pub fn set_tap_callback(&self, callback: Option<TapCallback>) -> Pending<()> {
        self.request(|reply| Command::SetTapCallback { callback, reply })
    }

    /// In manual focus mode taps lock focus and start the lens ramp
    pub fn set_manual_focus(&self, enabled: bool) -> Pending<()> {
        self.request(|reply| Command::SetManualFocus { enabled, reply })
    }

    /// Re-derive the preview orientation. Resolves to `None` before the
    /// preview is attached or when the surface cannot rotate video.
    pub fn on_orientation_changed(
        &self,
        orientation: InterfaceOrientation,
    ) -> Pending<Option<VideoOrientation>> {
        self.request(|reply| Command::OrientationChanged { orientation, reply })
    }

    pub fn snapshot(&self) -> Pending<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply })
    }
}

impl Drop for CameraSessionController {
    fn drop(&mut self) {
        let (reply, _) = oneshot::channel();
        let _ = self.commands.send(Command::Stop { reply });
    }
}
