use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::error::ConfigError;
use crate::job::Stage;

const SCHEMA_JSON: &str = include_str!("../../../../schema/client-config-v1.json");

/// Environment variable that replaces `api.base_url`.
pub const API_URL_ENV: &str = "PURIFY_API_URL";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: ClientConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies environment overrides and re-validates the result.
pub fn apply_env_overrides(mut config: ClientConfig) -> Result<ClientConfig, ConfigError> {
    if let Ok(url) = std::env::var(API_URL_ENV) {
        let url = url.trim();
        if !url.is_empty() {
            log::debug!("Using API base URL from {}: {}", API_URL_ENV, url);
            config.api.base_url = url.to_string();
        }
    }

    validate_config(&config)?;
    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks that the schema cannot express.
pub fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    validate_base_url(&config.api.base_url)?;

    if config.api.request_timeout_secs == 0 || config.api.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "API timeouts must be greater than zero".to_string(),
        });
    }

    if config.polling.interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "Poll interval must be greater than zero".to_string(),
        });
    }

    if config.polling.deadline() < config.polling.interval() {
        return Err(ConfigError::Validation {
            message: format!(
                "Poll deadline ({}s) is shorter than the poll interval ({}ms)",
                config.polling.deadline_secs, config.polling.interval_ms
            ),
        });
    }

    let transitions = Stage::ALL.len() - 1;
    if config.simulation.step_delays_ms.len() != transitions {
        return Err(ConfigError::Validation {
            message: format!(
                "simulation.step_delays_ms must have {} entries, got {}",
                transitions,
                config.simulation.step_delays_ms.len()
            ),
        });
    }

    if config.upload.allowed_extensions.is_empty() {
        return Err(ConfigError::Validation {
            message: "upload.allowed_extensions must not be empty".to_string(),
        });
    }

    Ok(())
}

fn validate_base_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidBaseUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidBaseUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
