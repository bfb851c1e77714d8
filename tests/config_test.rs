use snapcrab::config::{SnapCrabConfig, DEFAULT_RAMP_INTERVAL};
use snapcrab::session::SessionOptions;
use snapcrab::types::DevicePosition;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapcrab.toml");
    std::fs::write(
        &path,
        "[session]\ninitial_position = \"front\"\n\n[focus]\nramp_interval_ms = 10\n",
    )
    .unwrap();

    let config = SnapCrabConfig::load_from_file(&path).unwrap();
    assert_eq!(config.session.initial_position, DevicePosition::Front);
    assert!(!config.session.manual_focus);
    assert_eq!(config.focus.ramp_interval(), Duration::from_millis(10));
    assert_eq!(config.focus.ramp_step, 0.01);
    assert_eq!(config.capture.resolution, [1920, 1080]);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapcrab.toml");
    std::fs::write(&path, "[focus]\nramp_step = 2.5\n").unwrap();
    assert!(SnapCrabConfig::load_from_file(&path).is_err());

    std::fs::write(&path, "not = [valid").unwrap();
    assert!(SnapCrabConfig::load_from_file(&path).is_err());
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config").join("snapcrab.toml");

    let mut config = SnapCrabConfig::default();
    config.session.manual_focus = true;
    config.save_to_file(&path).unwrap();

    let loaded = SnapCrabConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_session_options_follow_config() {
    let mut config = SnapCrabConfig::default();
    config.session.initial_position = DevicePosition::Front;
    config.focus.ramp_interval_ms = 250;
    config.focus.restrict_range_on_bind = false;

    let options = SessionOptions::from(&config);
    assert_eq!(options.initial_position, DevicePosition::Front);
    assert_eq!(options.ramp_interval, Duration::from_millis(250));
    assert!(!options.restrict_range_on_bind);
    assert!(options.dispatcher.is_none());

    assert_eq!(SessionOptions::default().ramp_interval, DEFAULT_RAMP_INTERVAL);
}
