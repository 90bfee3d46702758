// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cliniq.toml` > `~/.config/cliniq/cliniq.toml` >
//! `/etc/cliniq/cliniq.toml` with environment variable overrides via the
//! `CLINIQ_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CliniqConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cliniq/cliniq.toml` (system-wide)
/// 3. `~/.config/cliniq/cliniq.toml` (user XDG config)
/// 4. `./cliniq.toml` (local directory)
/// 5. `CLINIQ_*` environment variables
pub fn load_config() -> Result<CliniqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CliniqConfig::default()))
        .merge(Toml::file("/etc/cliniq/cliniq.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cliniq/cliniq.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cliniq.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CliniqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CliniqConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CliniqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CliniqConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CLINIQ_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("CLINIQ_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CLINIQ_QUEUE_NOTIFY_WINDOW_MINUTES -> "queue_notify_window_minutes"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("notify_", "notify.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
