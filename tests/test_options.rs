//! Unit tests for `LabOptions`
//!
//! Tests defaults, the builder, JSON files, and environment overrides

use std::io::Write;

use rl_lab_controller::{ErrorKind, LabOptions, ParameterValue};

#[test]
fn test_defaults() {
    let options = LabOptions::default();
    assert_eq!(options.base_url, "http://localhost:5001");
    assert_eq!(options.algorithm, "Q-Learning");
    assert_eq!(options.environment, "FrozenLake-v1-NoSlip");
    assert_eq!(options.seed, Some(42));
    assert_eq!(options.default_episodes, 1000);
    assert_eq!(options.playback_interval().as_millis(), 200);
    assert_eq!(options.stream_read_timeout().as_secs(), 30);
    assert!(options.validate().is_ok());
}

#[test]
fn test_builder() {
    let options = LabOptions::builder()
        .base_url("http://engine:8000")
        .environment("Taxi-v3")
        .seed(None)
        .playback_interval_ms(50)
        .build();

    assert_eq!(options.base_url, "http://engine:8000");
    assert_eq!(options.environment, "Taxi-v3");
    assert_eq!(options.algorithm, "Q-Learning");
    assert_eq!(options.seed, None);
    assert_eq!(options.playback_interval_ms, 50);
}

#[test]
#[should_panic(expected = "playback interval must be greater than zero")]
fn test_builder_rejects_zero_interval() {
    let _ = LabOptions::builder().playback_interval_ms(0);
}

#[test]
fn test_from_json_file_fills_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "base_url": "http://10.0.0.5:5001",
            "algorithm": "SARSA",
            "parameters": {{"num_episodes": 250, "alpha": 0.2, "init": "zeros"}}
        }}"#
    )
    .expect("write");

    let options = LabOptions::from_json_file(file.path()).expect("load");
    assert_eq!(options.base_url, "http://10.0.0.5:5001");
    assert_eq!(options.algorithm, "SARSA");
    assert_eq!(options.environment, "FrozenLake-v1-NoSlip");
    assert_eq!(options.parameters.num_episodes(), Some(250));
    assert_eq!(
        options.parameters.get("alpha"),
        Some(&ParameterValue::Float(0.2))
    );
    assert_eq!(
        options.parameters.get("init"),
        Some(&ParameterValue::Text("zeros".to_string()))
    );
    assert_eq!(options.playback_interval_ms, 200);
}

#[test]
fn test_from_json_file_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{"playback_interval_ms": 0}}"#).expect("write");

    let err = LabOptions::from_json_file(file.path()).expect_err("invalid");
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_from_missing_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = LabOptions::from_json_file(dir.path().join("missing.json"));
    assert!(result.is_err());
}

#[test]
fn test_env_overrides() {
    let options = LabOptions::default()
        .apply_vars([
            ("RL_LAB_BASE_URL", "http://lab:9000"),
            ("RL_LAB_ENVIRONMENT", "CliffWalking-v0"),
            ("RL_LAB_SEED", "7"),
            ("RL_LAB_PLAYBACK_INTERVAL_MS", "100"),
            ("RL_LAB_STREAM_TIMEOUT_SECS", "5"),
            ("UNRELATED", "ignored"),
        ])
        .expect("apply");

    assert_eq!(options.base_url, "http://lab:9000");
    assert_eq!(options.environment, "CliffWalking-v0");
    assert_eq!(options.seed, Some(7));
    assert_eq!(options.playback_interval_ms, 100);
    assert_eq!(options.stream_read_timeout_secs, 5);
    assert_eq!(options.algorithm, "Q-Learning");
}

#[test]
fn test_env_override_must_parse() {
    let err = LabOptions::default()
        .apply_vars([("RL_LAB_SEED", "forty-two")])
        .expect_err("invalid seed");
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("RL_LAB_SEED"));

    let err = LabOptions::default()
        .apply_vars([("RL_LAB_BASE_URL", "  ")])
        .expect_err("empty url");
    assert_eq!(err.kind(), ErrorKind::Config);
}
