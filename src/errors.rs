use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Enumeration returned no usable video device
    NoCameraAvailable,
    /// The platform denied exclusive device configuration access
    ConfigurationLockFailed(String),
    /// A capture was requested but no output connection carries video
    NoVideoConnection,
    /// The captured buffer could not be turned into an image
    DecodeFailed(String),
    InitializationError(String),
    CaptureError(String),
    /// The serial queue is gone; the controller was released
    SessionClosed,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraError::NoCameraAvailable => write!(f, "No camera available"),
            CameraError::ConfigurationLockFailed(msg) => {
                write!(f, "Device configuration lock failed: {}", msg)
            }
            CameraError::NoVideoConnection => {
                write!(f, "No video connection on still image output")
            }
            CameraError::DecodeFailed(msg) => write!(f, "Image decode failed: {}", msg),
            CameraError::InitializationError(msg) => {
                write!(f, "Camera initialization error: {}", msg)
            }
            CameraError::CaptureError(msg) => write!(f, "Capture error: {}", msg),
            CameraError::SessionClosed => write!(f, "Camera session is closed"),
        }
    }
}

impl std::error::Error for CameraError {}

impl CameraError {
    /// Whether the caller can reasonably retry the same operation
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CameraError::SessionClosed | CameraError::NoCameraAvailable
        )
    }
}
