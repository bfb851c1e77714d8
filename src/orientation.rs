use crate::types::{InterfaceOrientation, VideoOrientation};

/// Map the host interface orientation onto the preview video orientation.
///
/// `Unknown` is treated as portrait.
pub fn video_orientation_for(orientation: InterfaceOrientation) -> VideoOrientation {
    match orientation {
        InterfaceOrientation::Unknown | InterfaceOrientation::Portrait => {
            VideoOrientation::Portrait
        }
        InterfaceOrientation::PortraitUpsideDown => VideoOrientation::PortraitUpsideDown,
        InterfaceOrientation::LandscapeLeft => VideoOrientation::LandscapeLeft,
        InterfaceOrientation::LandscapeRight => VideoOrientation::LandscapeRight,
    }
}
