mod common;

use common::{fast_options, phone_rig, wait_for};
use snapcrab::errors::CameraError;
use snapcrab::platform::InlineDispatcher;
use snapcrab::session::{FocusTarget, SessionOptions, TapCallback};
use snapcrab::types::{
    AutoFocusRangeRestriction, DevicePosition, FocusMode, SurfaceBounds, TapPoint,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn manual_options(interval: Duration) -> SessionOptions {
    let mut options = fast_options(DevicePosition::Back);
    options.manual_focus = true;
    options.ramp_interval = interval;
    options
}

#[tokio::test]
async fn test_tap_sets_normalized_point_of_interest() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.camera.start().await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(100.0, 200.0)).await.unwrap();

    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.focus_point, Some(FocusTarget { x: 0.25, y: 0.25 }));
    assert_eq!(device.focus_mode, FocusMode::ContinuousAutoFocus);
    assert_eq!(device.range_restriction, AutoFocusRangeRestriction::None);
    assert_eq!(device.unlocked_mutations, 0);
    assert!(!device.locked);
}

#[tokio::test]
async fn test_tap_outside_preview_is_clamped() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.camera.on_focus_tap(TapPoint::new(-50.0, 5000.0)).await.unwrap();

    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.focus_point, Some(FocusTarget { x: 0.0, y: 1.0 }));
}

#[tokio::test]
async fn test_tap_on_limited_camera_uses_what_it_supports() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.camera.set_device_position(DevicePosition::Front).await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(10.0, 10.0)).await.unwrap();

    let device = rig.backend.device_state(DevicePosition::Front).unwrap();
    assert_eq!(device.focus_point, None);
    assert_eq!(device.focus_mode, FocusMode::AutoFocus);
    assert_eq!(device.range_restriction, AutoFocusRangeRestriction::None);
}

#[tokio::test]
async fn test_zero_area_preview_skips_point_of_interest() {
    let rig = phone_rig(SessionOptions::default()).await;
    rig.surface.set_bounds(SurfaceBounds::new(0.0, 0.0));

    rig.camera.on_focus_tap(TapPoint::new(10.0, 10.0)).await.unwrap();

    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.focus_point, None);
    assert_eq!(device.range_restriction, AutoFocusRangeRestriction::None);
}

#[tokio::test]
async fn test_tap_callback_receives_raw_point() {
    let rig = phone_rig(SessionOptions::default()).await;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let callback: TapCallback = Arc::new(move |point: TapPoint| {
        let _ = tx.send(point);
    });
    rig.camera.set_tap_callback(Some(callback)).await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(12.5, 99.0)).await.unwrap();
    assert_eq!(rx.recv().await, Some(TapPoint::new(12.5, 99.0)));
}

#[tokio::test]
async fn test_inline_dispatcher_runs_callback_before_reply() {
    let options = SessionOptions::default().with_dispatcher(Arc::new(InlineDispatcher));
    let rig = phone_rig(options).await;
    let taps = Arc::new(AtomicUsize::new(0));
    let counter = taps.clone();
    let callback: TapCallback = Arc::new(move |_: TapPoint| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    rig.camera.set_tap_callback(Some(callback)).await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(3.0, 4.0)).await.unwrap();
    assert_eq!(taps.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tap_callback_fires_when_focus_fails() {
    let rig = phone_rig(SessionOptions::default()).await;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let callback: TapCallback = Arc::new(move |point: TapPoint| {
        let _ = tx.send(point);
    });
    rig.camera.set_tap_callback(Some(callback)).await.unwrap();
    rig.backend.set_fail_lock(DevicePosition::Back, true);

    let err = rig.camera.on_focus_tap(TapPoint::new(1.0, 2.0)).await.unwrap_err();
    assert!(matches!(err, CameraError::ConfigurationLockFailed(_)));
    assert_eq!(rx.recv().await, Some(TapPoint::new(1.0, 2.0)));
}

#[tokio::test]
async fn test_manual_focus_locks_and_ramps() {
    let rig = phone_rig(manual_options(Duration::from_millis(20))).await;
    rig.camera.start().await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(200.0, 400.0)).await.unwrap();
    let snapshot = wait_for(&rig.camera, |s| s.lens_position >= 0.03).await;
    assert!(snapshot.ramp_active);
    assert!(snapshot.manual_focus);

    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.focus_mode, FocusMode::Locked);
    assert!(device.lens_updates >= 3);
    assert!(device.lens_position > 0.0 && device.lens_position <= 1.0);
    assert_eq!(device.unlocked_mutations, 0);
}

#[tokio::test]
async fn test_first_ramp_step_is_immediate() {
    let rig = phone_rig(manual_options(Duration::from_secs(60))).await;
    rig.camera.start().await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    wait_for(&rig.camera, |s| s.lens_position > 0.0).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = rig.camera.snapshot().await.unwrap();
    assert!((snapshot.lens_position - 0.01).abs() < 1e-6);
    assert_eq!(snapshot.device_lens_position, Some(snapshot.lens_position));
    assert!(snapshot.ramp_active);
}

#[tokio::test]
async fn test_second_tap_does_not_restart_ramp() {
    let rig = phone_rig(manual_options(Duration::from_secs(60))).await;
    rig.camera.start().await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    wait_for(&rig.camera, |s| s.lens_position > 0.0).await;
    rig.camera.on_focus_tap(TapPoint::new(50.0, 50.0)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.lens_updates, 1);
}

#[tokio::test]
async fn test_disabling_manual_focus_ends_ramp() {
    let rig = phone_rig(manual_options(Duration::from_millis(10))).await;
    rig.camera.start().await.unwrap();
    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    wait_for(&rig.camera, |s| s.lens_position >= 0.02).await;

    rig.camera.set_manual_focus(false).await.unwrap();
    let updates = rig.backend.device_state(DevicePosition::Back).unwrap().lens_updates;
    assert!(!rig.camera.snapshot().await.unwrap().ramp_active);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        rig.backend.device_state(DevicePosition::Back).unwrap().lens_updates,
        updates
    );

    // Auto focus taps no longer lock the lens
    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.focus_mode, FocusMode::ContinuousAutoFocus);
}

#[tokio::test]
async fn test_stop_ends_ramp() {
    let rig = phone_rig(manual_options(Duration::from_millis(10))).await;
    rig.camera.start().await.unwrap();
    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    wait_for(&rig.camera, |s| s.lens_position > 0.0).await;

    rig.camera.stop().await.unwrap();
    let updates = rig.backend.device_state(DevicePosition::Back).unwrap().lens_updates;
    assert!(!rig.camera.snapshot().await.unwrap().ramp_active);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        rig.backend.device_state(DevicePosition::Back).unwrap().lens_updates,
        updates
    );
}

#[tokio::test]
async fn test_tap_after_stop_applies_one_step() {
    let rig = phone_rig(fast_options(DevicePosition::Back)).await;
    rig.camera.start().await.unwrap();
    rig.camera.stop().await.unwrap();
    rig.camera.set_manual_focus(true).await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    let snapshot = wait_for(&rig.camera, |s| s.lens_position > 0.0 && !s.ramp_active).await;
    assert!((snapshot.lens_position - 0.01).abs() < 1e-6);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.lens_updates, 1);
    assert_eq!(device.focus_mode, FocusMode::Locked);
}

#[tokio::test]
async fn test_ramp_runs_once_when_session_not_running() {
    let rig = phone_rig(manual_options(Duration::from_millis(10))).await;

    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    let snapshot = wait_for(&rig.camera, |s| s.lens_position > 0.0 && !s.ramp_active).await;
    assert!((snapshot.lens_position - 0.01).abs() < 1e-6);
}

#[tokio::test]
async fn test_manual_focus_can_be_enabled_later() {
    let rig = phone_rig(fast_options(DevicePosition::Back)).await;
    rig.camera.start().await.unwrap();
    rig.camera.set_manual_focus(true).await.unwrap();

    rig.camera.on_focus_tap(TapPoint::new(5.0, 5.0)).await.unwrap();
    wait_for(&rig.camera, |s| s.lens_position > 0.0).await;
    let device = rig.backend.device_state(DevicePosition::Back).unwrap();
    assert_eq!(device.focus_mode, FocusMode::Locked);
}
