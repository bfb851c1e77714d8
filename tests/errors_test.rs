#[cfg(test)]
mod error_tests {
    use snapcrab::config::ConfigError;
    use snapcrab::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_display() {
        assert_eq!(CameraError::NoCameraAvailable.to_string(), "No camera available");
        assert_eq!(
            CameraError::ConfigurationLockFailed("busy".to_string()).to_string(),
            "Device configuration lock failed: busy"
        );
        assert_eq!(
            CameraError::DecodeFailed("truncated".to_string()).to_string(),
            "Image decode failed: truncated"
        );
        assert_eq!(
            CameraError::CaptureError("Display test".to_string()).to_string(),
            "Capture error: Display test"
        );
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::InitializationError("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("InitializationError"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::NoVideoConnection;
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_recoverability() {
        assert!(!CameraError::SessionClosed.is_recoverable());
        assert!(!CameraError::NoCameraAvailable.is_recoverable());
        assert!(CameraError::ConfigurationLockFailed("busy".to_string()).is_recoverable());
        assert!(CameraError::NoVideoConnection.is_recoverable());
    }

    #[test]
    fn test_config_error_converts() {
        let error: CameraError = ConfigError::Invalid("bad step".to_string()).into();
        assert!(matches!(
        error,
        CameraError::InitializationError(ref msg) if msg.contains("bad step")
    ));
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CameraError>();
        assert_send_sync::<ConfigError>();
    }
}
