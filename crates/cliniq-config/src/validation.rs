// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive rates and well-formed URLs.

use crate::diagnostic::ConfigError;
use crate::model::CliniqConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CliniqConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.queue.average_consultation_minutes <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.average_consultation_minutes must be positive, got {}",
                config.queue.average_consultation_minutes
            ),
        });
    }

    if config.queue.allocation_max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.allocation_max_retries must be at least 1".to_string(),
        });
    }

    if config.queue.default_prefix.trim().is_empty()
        || !config
            .queue
            .default_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.default_prefix must be non-empty alphanumeric, got `{}`",
                config.queue.default_prefix
            ),
        });
    }

    if config.queue.notify_ahead_positions < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.notify_ahead_positions must be at least 1, got {}",
                config.queue.notify_ahead_positions
            ),
        });
    }

    if config.queue.notify_window_minutes < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.notify_window_minutes must be at least 1, got {}",
                config.queue.notify_window_minutes
            ),
        });
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must not be 0".to_string(),
        });
    }

    if let Some(url) = &config.notify.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::Validation {
                message: format!("notify.webhook_url must be an http(s) URL, got `{url}`"),
            });
        }
    }

    if config.notify.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "notify.timeout_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
