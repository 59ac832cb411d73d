// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and
//! positive retry bounds.

use crate::diagnostic::ConfigError;
use crate::model::TidingsConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TidingsConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.whatsapp.graph_api_version.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "whatsapp.graph_api_version must not be empty".to_string(),
        });
    }

    if !config.whatsapp.graph_base_url.starts_with("http") {
        errors.push(ConfigError::Validation {
            message: format!(
                "whatsapp.graph_base_url `{}` must be an http(s) URL",
                config.whatsapp.graph_base_url
            ),
        });
    }

    if config.queue.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.poll_interval_ms must be positive".to_string(),
        });
    }

    if config.queue.publish_max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.publish_max_attempts must be at least 1".to_string(),
        });
    }

    if config.queue.max_delivery_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_delivery_attempts must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = TidingsConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TidingsConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_publish_attempts_fails_validation() {
        let mut config = TidingsConfig::default();
        config.queue.publish_max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("publish_max_attempts"))));
    }

    #[test]
    fn non_http_graph_base_url_fails_validation() {
        let mut config = TidingsConfig::default();
        config.whatsapp.graph_base_url = "ftp://graph.example".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("graph_base_url"))));
    }

    #[test]
    fn all_errors_are_collected_not_first_only() {
        let mut config = TidingsConfig::default();
        config.server.host = "".to_string();
        config.storage.database_path = "".to_string();
        config.queue.poll_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "got: {errors:?}");
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = TidingsConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/tidings.db".to_string();
        config.whatsapp.app_secret = Some("secret".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
