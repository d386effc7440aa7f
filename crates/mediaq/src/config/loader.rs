use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

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

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.download_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "download_directory must not be empty".to_string(),
        });
    }
    if config.temp_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "temp_directory must not be empty".to_string(),
        });
    }

    if config.expiry_days < 1 {
        return Err(ConfigError::Validation {
            message: format!("expiry_days must be at least 1, got {}", config.expiry_days),
        });
    }

    let template = &config.output_template;
    if template.trim().is_empty() || template.contains('/') || template.contains('\\') {
        return Err(ConfigError::Validation {
            message: format!(
                "output_template must be a bare file name template: '{}'",
                template
            ),
        });
    }

    if config.mail.server.is_some() && config.mail.host_port().is_none() {
        return Err(ConfigError::Validation {
            message: format!(
                "mail.server must be 'host:port', got '{}'",
                config.mail.server.as_deref().unwrap_or_default()
            ),
        });
    }

    Ok(())
}
