//! Shared fixtures for session integration tests
#![allow(dead_code)]

use snapcrab::session::{CameraSessionController, SessionOptions};
use snapcrab::testing::{SyntheticBackend, SyntheticSurface};
use snapcrab::types::{DevicePosition, SessionSnapshot, SurfaceBounds};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const PREVIEW_WIDTH: f64 = 400.0;
pub const PREVIEW_HEIGHT: f64 = 800.0;

pub fn preview_surface() -> Arc<SyntheticSurface> {
    Arc::new(SyntheticSurface::new(SurfaceBounds::new(
        PREVIEW_WIDTH,
        PREVIEW_HEIGHT,
    )))
}

/// Fast ramp so timer-driven tests finish quickly
pub fn fast_options(position: DevicePosition) -> SessionOptions {
    let mut options = SessionOptions::default().with_position(position);
    options.ramp_interval = Duration::from_millis(20);
    options
}

pub struct Rig {
    pub camera: CameraSessionController,
    pub backend: SyntheticBackend,
    pub surface: Arc<SyntheticSurface>,
}

pub async fn phone_rig(options: SessionOptions) -> Rig {
    let backend = SyntheticBackend::phone();
    let surface = preview_surface();
    let camera = CameraSessionController::initialize_with(backend.boxed(), surface.clone(), options)
        .await
        .expect("synthetic session initializes");
    Rig {
        camera,
        backend,
        surface,
    }
}

/// Poll snapshots until `condition` holds
pub async fn wait_for(
    camera: &CameraSessionController,
    mut condition: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = camera.snapshot().await.expect("snapshot");
        if condition(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "condition not reached, last snapshot: {:?}",
            snapshot
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll an arbitrary predicate until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
