mod common;

use common::phone_rig;
use snapcrab::errors::CameraError;
use snapcrab::session::SessionOptions;
use snapcrab::types::{DevicePosition, FlashMode, TorchMode};

#[tokio::test]
async fn test_capability_queries() {
    let rig = phone_rig(SessionOptions::default()).await;
    assert!(rig.camera.has_flash().await.unwrap());
    assert!(rig.camera.has_torch().await.unwrap());

    rig.camera.switch_position().await.unwrap();
    assert!(!rig.camera.has_flash().await.unwrap());
    assert!(!rig.camera.has_torch().await.unwrap());
}

#[tokio::test]
async fn test_flash_toggle_is_an_involution() {
    let rig = phone_rig(SessionOptions::default()).await;

    assert!(rig.camera.toggle_flash().await.unwrap());
    assert_eq!(
        rig.backend.device_state(DevicePosition::Back).unwrap().flash_mode,
        FlashMode::On
    );
    assert!(!rig.camera.toggle_flash().await.unwrap());
    assert_eq!(
        rig.backend.device_state(DevicePosition::Back).unwrap().flash_mode,
        FlashMode::Off
    );
}

#[tokio::test]
async fn test_torch_toggle_is_an_involution() {
    let rig = phone_rig(SessionOptions::default()).await;

    assert!(rig.camera.toggle_torch().await.unwrap());
    assert!(!rig.camera.toggle_torch().await.unwrap());
    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.torch_mode, TorchMode::Off);
    assert_eq!(device.unlocked_mutations, 0);
    assert!(!device.locked);

    let stats = rig.backend.stats();
    assert_eq!(stats.open_brackets, 0);
}

#[tokio::test]
async fn test_toggle_without_capability_does_nothing() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.camera.set_device_position(DevicePosition::Front).await.unwrap();
    let before = rig.backend.device_state(DevicePosition::Front).unwrap();

    assert!(!rig.camera.toggle_flash().await.unwrap());
    assert!(!rig.camera.toggle_torch().await.unwrap());

    let after = rig.backend.device_state(DevicePosition::Front).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_auto_flash_is_left_alone() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.backend.set_flash_mode(DevicePosition::Back, FlashMode::Auto);

    assert!(!rig.camera.toggle_flash().await.unwrap());
    assert_eq!(
        rig.backend.device_state(DevicePosition::Back).unwrap().flash_mode,
        FlashMode::Auto
    );
}

#[tokio::test]
async fn test_toggle_surfaces_lock_failure() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.backend.set_fail_lock(DevicePosition::Back, true);

    let err = rig.camera.toggle_torch().await.unwrap_err();
    assert!(matches!(err, CameraError::ConfigurationLockFailed(_)));
    assert_eq!(
        rig.backend.device_state(DevicePosition::Back).unwrap().torch_mode,
        TorchMode::Off
    );
    assert_eq!(rig.backend.stats().open_brackets, 0);

    rig.backend.set_fail_lock(DevicePosition::Back, false);
    assert!(rig.camera.toggle_torch().await.unwrap());
}
