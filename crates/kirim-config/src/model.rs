// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kirim gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Kirim configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KirimConfig {
    /// HTTP server settings for the webhook ingestion endpoint.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Socket-driver gateway settings.
    #[serde(default)]
    pub socket_gateway: SocketGatewayConfig,

    /// Cloud API driver settings.
    #[serde(default)]
    pub cloud_api: CloudApiConfig,

    /// Outbound dispatch and session lifecycle settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Campaign batch processor settings.
    #[serde(default)]
    pub campaign: CampaignConfig,

    /// Identity normalization settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Operational alerting settings.
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
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
    "kirim.db".to_string()
}

/// Socket-driver gateway configuration (the self-hosted device-emulation
/// service, spoken over per-session HTTP).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SocketGatewayConfig {
    /// Base URL of the gateway API.
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Shared password used to authenticate sessions with the gateway.
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SocketGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            password: None,
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

fn default_gateway_url() -> String {
    "http://localhost:3001/api/v1/whatsapp".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

/// Cloud API driver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudApiConfig {
    /// Base URL of the Graph API.
    #[serde(default = "default_graph_url")]
    pub base_url: String,

    /// API version segment.
    #[serde(default = "default_graph_version")]
    pub api_version: String,
}

impl Default for CloudApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_url(),
            api_version: default_graph_version(),
        }
    }
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_version() -> String {
    "v18.0".to_string()
}

/// Outbound dispatch and session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Fixed delay between sends on one session queue, in milliseconds.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,

    /// Delay before a reconnect attempt after an unexpected disconnect,
    /// in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_delay_ms: default_send_delay_ms(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

fn default_send_delay_ms() -> u64 {
    2000
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

/// Campaign batch processor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    /// Maximum jobs claimed per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Throughput window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum sends per window; sends are spaced evenly across it.
    #[serde(default = "default_window_limit")]
    pub window_limit: u64,

    /// Seconds between processor ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            window_secs: default_window_secs(),
            window_limit: default_window_limit(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

fn default_batch_size() -> i64 {
    50
}

fn default_window_secs() -> u64 {
    60
}

fn default_window_limit() -> u64 {
    50
}

fn default_tick_interval_secs() -> u64 {
    60
}

/// Identity normalization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Country calling code substituted for a leading national "0".
    #[serde(default = "default_country_prefix")]
    pub country_prefix: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            country_prefix: default_country_prefix(),
        }
    }
}

fn default_country_prefix() -> String {
    "62".to_string()
}

/// Operational alerting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsConfig {
    /// Optional webhook URL receiving operational alerts. `None` disables
    /// the alert webhook.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Timeout for webhook deliveries, in milliseconds.
    #[serde(default = "default_alert_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: default_alert_timeout_ms(),
        }
    }
}

fn default_alert_timeout_ms() -> u64 {
    5000
}
