// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system: layered loading,
//! validation, and diagnostic conversion.

use cliniq_config::{load_and_validate_str, load_config_from_path, ConfigError};

#[test]
fn full_config_round_trips() {
    let config = load_and_validate_str(
        r#"
[service]
name = "front-desk"
log_level = "debug"

[storage]
database_path = "/var/lib/cliniq/queue.db"

[queue]
average_consultation_minutes = 12
allocation_max_retries = 5
allocation_backoff_ms = 20
default_prefix = "B"
notify_ahead_positions = 2
notify_window_minutes = 45
sweep_interval_secs = 30

[notify]
webhook_url = "https://sms-relay.internal/notify"
timeout_secs = 3

[gateway]
host = "0.0.0.0"
port = 8080
bearer_token = "front-desk-secret"
"#,
    )
    .unwrap();

    assert_eq!(config.service.name, "front-desk");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/var/lib/cliniq/queue.db");
    assert_eq!(config.queue.average_consultation_minutes, 12);
    assert_eq!(config.queue.allocation_max_retries, 5);
    assert_eq!(config.queue.default_prefix, "B");
    assert_eq!(config.queue.sweep_interval_secs, 30);
    assert_eq!(
        config.notify.webhook_url.as_deref(),
        Some("https://sms-relay.internal/notify")
    );
    assert_eq!(config.notify.timeout_secs, 3);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("front-desk-secret"));
}

#[test]
fn empty_config_is_valid() {
    let config = load_and_validate_str("").unwrap();
    assert_eq!(config.service.name, "cliniq");
}

#[test]
fn typo_in_key_produces_suggestion() {
    let errors = load_and_validate_str(
        r#"
[queue]
averge_consultation_minutes = 15
"#,
    )
    .unwrap_err();

    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey { suggestion, .. } => {
            suggestion.as_deref() == Some("average_consultation_minutes")
        }
        _ => false,
    });
    assert!(found, "expected a typo suggestion, got: {errors:?}");
}

#[test]
fn semantic_validation_runs_after_parse() {
    let errors = load_and_validate_str(
        r#"
[queue]
average_consultation_minutes = -5
"#,
    )
    .unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn loads_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cliniq.toml");
    std::fs::write(
        &path,
        r#"
[gateway]
port = 9999
"#,
    )
    .unwrap();

    let config = load_config_from_path(&path).unwrap();
    assert_eq!(config.gateway.port, 9999);
}
