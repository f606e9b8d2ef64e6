//! Configuration files on disk

use facial_gesture_control::{
    config::{Config, EXAMPLE_CONFIG},
    session::RoundEndPolicy,
    Error,
};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let mut config = Config::default();
    config.session.total_rounds = 3;
    config.session.end_policy = RoundEndPolicy::EndOnSuccess;
    config.smoothing.filter = "median:5".to_string();
    config.zones.left = 0.3;
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    loaded.validate().unwrap();
}

#[test]
fn test_example_file_loads() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(EXAMPLE_CONFIG.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_session_overrides_from_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "session:\n  round_secs: 5.5\n  end_policy: end_on_success\n\
         expression:\n  wink_asymmetry: 0.1"
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    let session = config.session_config().unwrap();
    assert_eq!(session.round.as_millis(), 5_500);
    assert_eq!(session.end_policy, RoundEndPolicy::EndOnSuccess);
    assert_eq!(session.thresholds.wink_asymmetry, 0.1);
    // untouched thresholds keep their defaults
    assert_eq!(session.thresholds.wink_closed_fraction, 0.6);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(dir.path().join("missing.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_malformed_yaml_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "session: [not, a, map]").unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(Error::ConfigError(_))));
}

#[test]
fn test_unknown_end_policy_rejected() {
    assert!(Config::from_yaml("session:\n  end_policy: sometimes\n").is_err());
}

#[test]
fn test_overflowing_max_score_rejected() {
    let yaml = "session:\n  total_rounds: 100\n  round_points: 50000000\n";
    let config = Config::from_yaml(yaml).unwrap();
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

    let yaml = "session:\n  total_rounds: 1\n  round_points: 50000000\n";
    Config::from_yaml(yaml).unwrap().validate().unwrap();
}

#[test]
fn test_tracking_sets_face_loss_tolerance() {
    let config = Config::from_yaml("tracking:\n  max_lost_frames: 4\n").unwrap();
    assert_eq!(config.session_config().unwrap().face_loss_tolerance, 4);
    assert_eq!(Config::default().session_config().unwrap().face_loss_tolerance, 10);
}
