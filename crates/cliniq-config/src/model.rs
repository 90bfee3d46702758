// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the cliniq queue token service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level cliniq configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CliniqConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue behavior: wait-time rate, allocation retries, notification sweep.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Outbound notification gateway settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "cliniq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "cliniq.db".to_string()
}

/// Queue behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Minutes of estimated wait per waiting patient. A fixed rate keeps the
    /// estimate stable; upgrading to a rolling average of the day's completed
    /// consultations would not change the recalculation contract.
    #[serde(default = "default_average_consultation_minutes")]
    pub average_consultation_minutes: i64,

    /// Maximum sequencer retries on an allocation conflict.
    #[serde(default = "default_allocation_max_retries")]
    pub allocation_max_retries: u32,

    /// Initial backoff between allocation retries, doubled per attempt.
    #[serde(default = "default_allocation_backoff_ms")]
    pub allocation_backoff_ms: u64,

    /// Token prefix (queue lane) used when a request does not name one.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    /// How many queue positions ahead the "your turn soon" sweep covers.
    #[serde(default = "default_notify_ahead_positions")]
    pub notify_ahead_positions: i64,

    /// Minimum gap between repeated notifications of the same type to the
    /// same token.
    #[serde(default = "default_notify_window_minutes")]
    pub notify_window_minutes: i64,

    /// How often the notification sweep runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            average_consultation_minutes: default_average_consultation_minutes(),
            allocation_max_retries: default_allocation_max_retries(),
            allocation_backoff_ms: default_allocation_backoff_ms(),
            default_prefix: default_prefix(),
            notify_ahead_positions: default_notify_ahead_positions(),
            notify_window_minutes: default_notify_window_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_average_consultation_minutes() -> i64 {
    10
}

fn default_allocation_max_retries() -> u32 {
    3
}

fn default_allocation_backoff_ms() -> u64 {
    10
}

fn default_prefix() -> String {
    "A".to_string()
}

fn default_notify_ahead_positions() -> i64 {
    3
}

fn default_notify_window_minutes() -> i64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Outbound notification gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Webhook endpoint receiving notification requests. `None` disables
    /// outbound notifications entirely (they are logged and dropped).
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Request timeout for a single notification send.
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

fn default_notify_timeout_secs() -> u64 {
    5
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for staff endpoints. `None` disables auth (local use).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8350
}
