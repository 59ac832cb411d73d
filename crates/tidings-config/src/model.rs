// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tidings messaging pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tidings configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values;
/// WhatsApp credentials have no defaults and must be supplied before `serve`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidingsConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Business API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Durable queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
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
    "tidings".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
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
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tidings").join("tidings.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tidings.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Business API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Graph API bearer token. `None` requires environment variable.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Shared secret for webhook HMAC signature verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed during the webhook subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API version segment, e.g. "v19.0".
    #[serde(default = "default_graph_api_version")]
    pub graph_api_version: String,

    /// Graph API base URL. Overridable for testing.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Phone-number id used for sends that do not specify one.
    #[serde(default)]
    pub default_phone_number_id: Option<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            app_secret: None,
            verify_token: None,
            graph_api_version: default_graph_api_version(),
            graph_base_url: default_graph_base_url(),
            default_phone_number_id: None,
        }
    }
}

fn default_graph_api_version() -> String {
    "v19.0".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

/// Durable queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Consumer poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout for a single queue publish, in seconds.
    #[serde(default = "default_publish_timeout_secs")]
    pub publish_timeout_secs: u64,

    /// Bounded retry for the ingress publish step.
    #[serde(default = "default_publish_max_attempts")]
    pub publish_max_attempts: u32,

    /// Consumer deliveries before an entry is dead-lettered.
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            publish_timeout_secs: default_publish_timeout_secs(),
            publish_max_attempts: default_publish_max_attempts(),
            max_delivery_attempts: default_max_delivery_attempts(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_publish_timeout_secs() -> u64 {
    5
}

fn default_publish_max_attempts() -> u32 {
    3
}

fn default_max_delivery_attempts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TidingsConfig::default();
        assert_eq!(config.service.name, "tidings");
        assert_eq!(config.server.port, 3000);
        assert!(config.storage.wal_mode);
        assert_eq!(config.whatsapp.graph_api_version, "v19.0");
        assert_eq!(config.queue.publish_max_attempts, 3);
        assert_eq!(config.queue.max_delivery_attempts, 3);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let toml_str = r#"
[servce]
host = "0.0.0.0"
"#;
        assert!(toml::from_str::<TidingsConfig>(toml_str).is_err());
    }

    #[test]
    fn unknown_section_key_is_rejected() {
        let toml_str = r#"
[whatsapp]
acces_token = "tok"
"#;
        assert!(toml::from_str::<TidingsConfig>(toml_str).is_err());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let toml_str = r#"
[whatsapp]
app_secret = "shh"

[queue]
poll_interval_ms = 50
"#;
        let config: TidingsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.whatsapp.app_secret.as_deref(), Some("shh"));
        assert_eq!(config.whatsapp.graph_base_url, "https://graph.facebook.com");
        assert_eq!(config.queue.poll_interval_ms, 50);
        assert_eq!(config.queue.publish_timeout_secs, 5);
    }
}
