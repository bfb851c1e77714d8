//! SnapCrab: camera session control for Tauri applications
//!
//! A single serial session owns the capture pipeline: front/back device
//! selection, flash and torch toggles, tap-to-focus with an optional manual
//! lens ramp, JPEG still capture and preview orientation tracking.
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! snapcrab = "0.1"
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(snapcrab::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod commands;
pub mod config;
pub mod errors;
pub mod orientation;
pub mod platform;
pub mod session;
pub mod types;

// Offline capture platform for tests and demos
pub mod testing;

pub use config::SnapCrabConfig;
pub use errors::CameraError;
pub use orientation::video_orientation_for;
pub use session::{CameraSessionController, CapturedImage, Pending, SessionOptions};
pub use types::{DevicePosition, InterfaceOrientation, SurfaceBounds, TapPoint, VideoOrientation};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the SnapCrab plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("snapcrab")
        .invoke_handler(tauri::generate_handler![
            // Session lifecycle
            commands::session::initialize_camera_session,
            commands::session::start_camera_session,
            commands::session::stop_camera_session,
            commands::session::release_camera_session,
            commands::session::get_session_status,
            commands::session::list_camera_devices,
            // Device and lighting
            commands::session::set_camera_position,
            commands::session::switch_camera_position,
            commands::session::get_flash_available,
            commands::session::get_torch_available,
            commands::session::toggle_camera_flash,
            commands::session::toggle_camera_torch,
            // Focus, capture, orientation
            commands::session::focus_at_point,
            commands::session::set_manual_focus,
            commands::session::capture_photo,
            commands::session::update_interface_orientation,
            // Configuration
            commands::config::get_config,
            commands::config::update_config,
            commands::config::update_focus_config,
            commands::config::reset_config,
        ])
        .build()
}

/// Initialize logging for the camera session
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "snapcrab=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        os: std::env::consts::OS.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub os: String,
}
