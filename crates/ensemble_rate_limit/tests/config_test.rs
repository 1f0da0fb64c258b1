//! Tests for layered configuration.

use ensemble_rate_limit::{EnsembleConfig, RetryPolicy};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_are_valid() {
    let config = EnsembleConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.retry, RetryPolicy::default());
    assert_eq!(config.run.orchestrator_role, "Orchestrator");
    assert_eq!(config.storage.log_file, "log.jsonl");
    assert_eq!(config.engine.required_env, vec!["OPENAI_API_KEY".to_string()]);
}

#[test]
fn test_from_file_fills_missing_keys() {
    let file = write_config(
        r#"
[storage]
logs_dir = "/tmp/ensemble-runs"

[retry]
max_attempts = 3
"#,
    );
    let config = EnsembleConfig::from_file(file.path()).unwrap();
    assert_eq!(config.storage.logs_dir, PathBuf::from("/tmp/ensemble-runs"));
    assert_eq!(config.storage.log_file, "log.jsonl");
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.safety_margin_ms, 1000);
}

#[test]
fn test_explicit_file_overrides_bundled_defaults() {
    let file = write_config(
        r#"
[run]
orchestrator_role = "Lead"

[engine]
command = "python3"
args = ["helper.py"]
"#,
    );
    let config = EnsembleConfig::load_with(Some(file.path())).unwrap();
    assert_eq!(config.run.orchestrator_role, "Lead");
    assert_eq!(config.run.render_buffer, 64);
    assert_eq!(config.engine.command.as_deref(), Some("python3"));
    assert_eq!(config.engine.args, vec!["helper.py".to_string()]);
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(
        r#"
[retry]
min_delay_ms = 10000
max_delay_ms = 10
"#,
    );
    assert!(EnsembleConfig::from_file(file.path()).is_err());
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let missing = std::env::temp_dir().join("ensemble-does-not-exist.toml");
    assert!(EnsembleConfig::load_with(Some(&missing)).is_err());
}
