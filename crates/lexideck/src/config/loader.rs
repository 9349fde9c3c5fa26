use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::sources::SourceRegistry;

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

    validate_config(&config, &SourceRegistry::builtin())?;

    Ok(config)
}

/// `~/.lexideck/config.json`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".lexideck").join("config.json"))
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

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &Config, registry: &SourceRegistry) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for (field, code) in [("from_lang", &config.from_lang), ("to_lang", &config.to_lang)] {
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ConfigError::Validation {
                message: format!("{} must be a two-letter language code, got '{}'", field, code),
            });
        }
    }

    if config.sources.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one source must be configured".to_string(),
        });
    }

    let mut names = HashSet::new();
    for source in &config.sources {
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate source '{}'", source.name),
            });
        }
        if !registry.contains(&source.name) {
            return Err(ConfigError::UnknownSource {
                name: source.name.clone(),
                available: registry.names().join(", "),
            });
        }
        if source.settings.limit == Some(0) {
            return Err(ConfigError::Validation {
                message: format!("Source '{}' has a limit of 0", source.name),
            });
        }
    }

    if config.http.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "http.timeout_secs must be greater than 0".to_string(),
        });
    }

    Ok(())
}
