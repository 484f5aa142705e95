// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kirim.toml` > `~/.config/kirim/kirim.toml` >
//! `/etc/kirim/kirim.toml` with environment variable overrides via the
//! `KIRIM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KirimConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kirim/kirim.toml` (system-wide)
/// 3. `~/.config/kirim/kirim.toml` (user XDG config)
/// 4. `./kirim.toml` (local directory)
/// 5. `KIRIM_*` environment variables
pub fn load_config() -> Result<KirimConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KirimConfig::default()))
        .merge(Toml::file("/etc/kirim/kirim.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kirim/kirim.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kirim.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KirimConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KirimConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KirimConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KirimConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KIRIM_DISPATCH_SEND_DELAY_MS` must map
/// to `dispatch.send_delay_ms`, not `dispatch.send.delay.ms`.
fn env_provider() -> Env {
    Env::prefixed("KIRIM_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("socket_gateway_", "socket_gateway.", 1)
            .replacen("cloud_api_", "cloud_api.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("campaign_", "campaign.", 1)
            .replacen("identity_", "identity.", 1)
            .replacen("alerts_", "alerts.", 1);
        mapped.into()
    })
}
