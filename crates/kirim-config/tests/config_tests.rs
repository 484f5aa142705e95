// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Kirim configuration system.

use kirim_config::load_config_from_str;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_kirim_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"

[storage]
database_path = "/tmp/test.db"

[socket_gateway]
base_url = "http://gateway:3001/api/v1/whatsapp"
password = "secret"
timeout_secs = 10

[cloud_api]
api_version = "v19.0"

[dispatch]
send_delay_ms = 1500
reconnect_delay_secs = 10

[campaign]
batch_size = 25
window_secs = 30
window_limit = 20

[identity]
country_prefix = "44"

[alerts]
webhook_url = "https://ops.example.com/alerts"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert_eq!(config.socket_gateway.password.as_deref(), Some("secret"));
    assert_eq!(config.socket_gateway.timeout_secs, 10);
    assert_eq!(config.cloud_api.api_version, "v19.0");
    assert_eq!(config.dispatch.send_delay_ms, 1500);
    assert_eq!(config.campaign.batch_size, 25);
    assert_eq!(config.identity.country_prefix, "44");
    assert_eq!(
        config.alerts.webhook_url.as_deref(),
        Some("https://ops.example.com/alerts")
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.log_level, "info");
    assert_eq!(config.storage.database_path, "kirim.db");
    assert!(config.socket_gateway.password.is_none());
    assert_eq!(config.dispatch.send_delay_ms, 2000);
    assert_eq!(config.dispatch.reconnect_delay_secs, 5);
    assert_eq!(config.campaign.batch_size, 50);
    assert_eq!(config.campaign.window_secs, 60);
    assert_eq!(config.campaign.window_limit, 50);
    assert_eq!(config.identity.country_prefix, "62");
    assert!(config.alerts.webhook_url.is_none());
    assert_eq!(config.alerts.timeout_ms, 5000);
}

/// Unknown field in a section is rejected.
#[test]
fn unknown_field_produces_error() {
    let toml = r#"
[dispatch]
send_delay = 1000
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("send_delay"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Partial sections keep defaults for unset fields.
#[test]
fn partial_section_keeps_other_defaults() {
    let toml = r#"
[campaign]
batch_size = 10
"#;

    let config = load_config_from_str(toml).expect("partial section should parse");
    assert_eq!(config.campaign.batch_size, 10);
    assert_eq!(config.campaign.window_secs, 60);
    assert_eq!(config.campaign.window_limit, 50);
}
