use super::config::current_config;
use crate::platform::desktop::list_cameras;
use crate::platform::{DesktopBackend, PreviewLayer, PreviewSurface, UiDispatcher, UiJob};
use crate::errors::CameraError;
use crate::session::{CameraSessionController, SessionOptions, TapCallback};
use crate::types::{
    CameraDeviceInfo, DevicePosition, InterfaceOrientation, SessionSnapshot, SurfaceBounds,
    TapPoint, VideoGravity, VideoOrientation,
};
use serde::Serialize;
use std::sync::{Arc, RwLock as SyncRwLock};
use tauri::{command, AppHandle, Emitter, Runtime};
use tokio::sync::RwLock;

pub const FOCUS_TAP_EVENT: &str = "snapcrab://focus-tap";
pub const PREVIEW_EVENT: &str = "snapcrab://preview";

/// Preview-side notifications forwarded to the webview
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewEvent {
    Attached { gravity: VideoGravity, frame: SurfaceBounds },
    Orientation { orientation: VideoOrientation },
}

type EventSink = Arc<dyn Fn(PreviewEvent) + Send + Sync>;

/// Preview element living in the webview. The frontend reports its bounds;
/// preview changes are sent back as events.
pub struct WebviewSurface {
    bounds: SyncRwLock<SurfaceBounds>,
    sink: EventSink,
}

impl WebviewSurface {
    fn new(bounds: SurfaceBounds, sink: EventSink) -> Self {
        Self {
            bounds: SyncRwLock::new(bounds),
            sink,
        }
    }

    fn set_bounds(&self, bounds: SurfaceBounds) {
        match self.bounds.write() {
            Ok(mut current) => *current = bounds,
            Err(e) => log::error!("Preview bounds lock poisoned: {}", e),
        }
    }
}

impl PreviewSurface for WebviewSurface {
    fn bounds(&self) -> SurfaceBounds {
        self.bounds.read().map(|b| *b).unwrap_or_default()
    }

    fn attach_preview(&self, layer: &PreviewLayer) {
        (self.sink)(PreviewEvent::Attached {
            gravity: layer.gravity,
            frame: layer.frame,
        });
    }

    fn set_video_orientation(&self, orientation: VideoOrientation) {
        (self.sink)(PreviewEvent::Orientation { orientation });
    }
}

/// Runs UI callbacks on the Tauri main thread
pub struct TauriDispatcher<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> UiDispatcher for TauriDispatcher<R> {
    fn dispatch(&self, job: UiJob) {
        if let Err(e) = self.app.run_on_main_thread(job) {
            log::error!("Failed to dispatch to main thread: {}", e);
        }
    }
}

struct ActiveSession {
    controller: Arc<CameraSessionController>,
    surface: Arc<WebviewSurface>,
}

lazy_static::lazy_static! {
    static ref ACTIVE_SESSION: Arc<RwLock<Option<ActiveSession>>> = Arc::new(RwLock::new(None));
}

async fn controller() -> Result<Arc<CameraSessionController>, String> {
    ACTIVE_SESSION
        .read()
        .await
        .as_ref()
        .map(|s| s.controller.clone())
        .ok_or_else(|| "Camera session not initialized".to_string())
}

/// Map a controller result for the frontend. A session that can no longer
/// serve requests is dropped from the registry so the next call reports it
/// as uninitialized.
async fn settle<T>(result: Result<T, CameraError>) -> Result<T, String> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_recoverable() => Err(e.to_string()),
        Err(e) => {
            log::error!("Releasing camera session: {}", e);
            ACTIVE_SESSION.write().await.take();
            Err(e.to_string())
        }
    }
}

/// JPEG still returned to the frontend
#[derive(Debug, Clone, Serialize)]
pub struct CapturedPhoto {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub data: Vec<u8>,
    pub captured_at: String,
}

fn parse_position(
    position: Option<String>,
    fallback: DevicePosition,
) -> Result<DevicePosition, String> {
    match position {
        Some(p) => p.parse(),
        None => Ok(fallback),
    }
}

/// Create the camera session, replacing any existing one
#[command]
pub async fn initialize_camera_session<R: Runtime>(
    app: AppHandle<R>,
    position: Option<String>,
    surface_width: f64,
    surface_height: f64,
    manual_focus: Option<bool>,
) -> Result<SessionSnapshot, String> {
    let config = current_config()?;
    let mut options = SessionOptions::from(&config);
    options.initial_position = parse_position(position, options.initial_position)?;
    if let Some(manual) = manual_focus {
        options.manual_focus = manual;
    }
    options.dispatcher = Some(Arc::new(TauriDispatcher { app: app.clone() }));

    log::info!(
        "Initializing camera session: position={}, surface={}x{}",
        options.initial_position,
        surface_width,
        surface_height
    );

    let mut active = ACTIVE_SESSION.write().await;
    if let Some(previous) = active.take() {
        let _ = previous.controller.stop().await;
    }

    let preview_app = app.clone();
    let surface = Arc::new(WebviewSurface::new(
        SurfaceBounds::new(surface_width, surface_height),
        Arc::new(move |event: PreviewEvent| {
            if let Err(e) = preview_app.emit(PREVIEW_EVENT, event) {
                log::warn!("Failed to emit preview event: {}", e);
            }
        }),
    ));

    let backend = Box::new(DesktopBackend::new(config.capture.clone()));
    let controller = CameraSessionController::initialize_with(backend, surface.clone(), options)
        .await
        .map_err(|e| format!("Failed to initialize camera session: {}", e))?;

    let tap_app = app.clone();
    let on_tap: TapCallback = Arc::new(move |point: TapPoint| {
        if let Err(e) = tap_app.emit(FOCUS_TAP_EVENT, point) {
            log::warn!("Failed to emit focus tap: {}", e);
        }
    });
    controller
        .set_tap_callback(Some(on_tap))
        .await
        .map_err(|e| e.to_string())?;

    let snapshot = controller.snapshot().await.map_err(|e| e.to_string())?;
    *active = Some(ActiveSession {
        controller: Arc::new(controller),
        surface,
    });
    Ok(snapshot)
}

#[command]
pub async fn start_camera_session() -> Result<(), String> {
    let controller = controller().await?;
    settle(controller.start().await).await
}

#[command]
pub async fn stop_camera_session() -> Result<(), String> {
    let controller = controller().await?;
    settle(controller.stop().await).await
}

/// Stop and drop the active session
#[command]
pub async fn release_camera_session() -> Result<(), String> {
    let previous = ACTIVE_SESSION.write().await.take();
    match previous {
        Some(session) => {
            session.controller.stop().await.map_err(|e| e.to_string())?;
            log::info!("Camera session released");
            Ok(())
        }
        None => Ok(()),
    }
}

#[command]
pub async fn set_camera_position(position: String) -> Result<SessionSnapshot, String> {
    let position: DevicePosition = position.parse()?;
    let controller = controller().await?;
    settle(controller.set_device_position(position).await)
        .await
        .map_err(|e| format!("Failed to switch camera: {}", e))?;
    settle(controller.snapshot().await).await
}

#[command]
pub async fn switch_camera_position() -> Result<DevicePosition, String> {
    let controller = controller().await?;
    settle(controller.switch_position().await)
        .await
        .map_err(|e| format!("Failed to switch camera: {}", e))
}

#[command]
pub async fn get_flash_available() -> Result<bool, String> {
    let controller = controller().await?;
    settle(controller.has_flash().await).await
}

#[command]
pub async fn get_torch_available() -> Result<bool, String> {
    let controller = controller().await?;
    settle(controller.has_torch().await).await
}

#[command]
pub async fn toggle_camera_flash() -> Result<bool, String> {
    let controller = controller().await?;
    settle(controller.toggle_flash().await).await
}

#[command]
pub async fn toggle_camera_torch() -> Result<bool, String> {
    let controller = controller().await?;
    settle(controller.toggle_torch().await).await
}

#[command]
pub async fn capture_photo() -> Result<CapturedPhoto, String> {
    let controller = controller().await?;
    let image = settle(controller.capture().await).await.map_err(|e| {
        log::error!("Failed to capture photo: {}", e);
        format!("Failed to capture photo: {}", e)
    })?;

    log::info!("Captured photo {}x{}", image.width(), image.height());
    Ok(CapturedPhoto {
        width: image.width(),
        height: image.height(),
        format: "jpeg".to_string(),
        captured_at: image.captured_at().to_rfc3339(),
        data: image.into_encoded().to_vec(),
    })
}

/// Focus at a point in preview-element coordinates
#[command]
pub async fn focus_at_point(x: f64, y: f64) -> Result<(), String> {
    let controller = controller().await?;
    settle(controller.on_focus_tap(TapPoint::new(x, y)).await).await
}

#[command]
pub async fn set_manual_focus(enabled: bool) -> Result<(), String> {
    let controller = controller().await?;
    settle(controller.set_manual_focus(enabled).await).await
}

/// Report a new preview element size and interface orientation
#[command]
pub async fn update_interface_orientation(
    orientation: InterfaceOrientation,
    surface_width: Option<f64>,
    surface_height: Option<f64>,
) -> Result<Option<VideoOrientation>, String> {
    let (controller, surface) = ACTIVE_SESSION
        .read()
        .await
        .as_ref()
        .map(|s| (s.controller.clone(), s.surface.clone()))
        .ok_or_else(|| "Camera session not initialized".to_string())?;

    if let (Some(width), Some(height)) = (surface_width, surface_height) {
        surface.set_bounds(SurfaceBounds::new(width, height));
    }
    settle(controller.on_orientation_changed(orientation).await).await
}

#[command]
pub async fn get_session_status() -> Result<SessionSnapshot, String> {
    let controller = controller().await?;
    settle(controller.snapshot().await).await
}

#[command]
pub async fn list_camera_devices() -> Result<Vec<CameraDeviceInfo>, String> {
    tokio::task::spawn_blocking(list_cameras)
        .await
        .map_err(|e| format!("Task join error: {}", e))?
        .map_err(|e| e.to_string())
}
