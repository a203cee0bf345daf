//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::StashConfig;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &StashConfig) -> ConfigResult<()> {
    validate_storage(config)?;
    validate_logging(config)?;
    validate_models(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_storage(config: &StashConfig) -> ConfigResult<()> {
    let s = &config.storage;

    if s.root_key.trim().is_empty() {
        return Err(invalid("storage.root_key", "root key must not be empty"));
    }
    if s.root_key.contains('\0') {
        return Err(invalid(
            "storage.root_key",
            "root key must not contain null bytes",
        ));
    }
    if s.backend.needs_path() && s.path.as_ref().is_none_or(|p| p.as_os_str().is_empty()) {
        return Err(invalid(
            "storage.path",
            format!("the {:?} backend needs a directory path", s.backend),
        ));
    }
    Ok(())
}

fn validate_logging(config: &StashConfig) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

fn validate_models(config: &StashConfig) -> ConfigResult<()> {
    for (name, model) in &config.models {
        if model.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(invalid(
                format!("models.{name}.url"),
                "url must not be empty when set",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for (rel, target) in model.relationship_targets() {
            if !seen.insert(rel) {
                return Err(invalid(
                    format!("models.{name}.{rel}"),
                    "relationship is declared more than once",
                ));
            }
            if !config.models.contains_key(target) {
                return Err(invalid(
                    format!("models.{name}.{rel}"),
                    format!("related model '{target}' is not declared"),
                ));
            }
        }
    }
    Ok(())
}
