//! Config file discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `~/.keystash/config.toml` (user)
//! 3. Merge the explicitly requested file, which must exist
//! 4. Apply `KEYSTASH_*` environment overrides
//! 5. Deserialize, expand `~/` in the storage path, validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::StashConfig;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the configuration with layered precedence.
///
/// `home_override` replaces the user's home directory for discovering the
/// user layer and expanding `~/`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, the
/// explicit file is missing, or the merged configuration is invalid.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<StashConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

/// [`load`] with an explicit set of environment variables.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<StashConfig> {
    let home = match home_override {
        Some(h) => h.to_path_buf(),
        None => home_directory()?,
    };

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let user_path = home.join(".keystash").join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_overrides(&mut merged, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    let mut config: StashConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    config.storage.path = config
        .storage
        .path
        .take()
        .map(|path| expand_home(&path, &home));

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a single file on top of the built-in defaults, with
/// no user layer and no environment overrides. A leading `~` in the storage
/// path is expanded to the user's home directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result is invalid.
pub fn load_file(path: &Path) -> ConfigResult<StashConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    deep_merge(&mut merged, &overlay);

    let mut config: StashConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: path.display().to_string(),
                source: e,
            })?;

    config.storage.path = match config.storage.path.take() {
        Some(p) if p.starts_with("~") => Some(expand_home(&p, &home_directory()?)),
        other => other,
    };

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Replace a leading `~` component with `home`.
fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendKind;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize() {
        let config: StashConfig = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.storage.root_key, "DS.LSAdapter");
        assert_eq!(config.storage.backend, BackendKind::File);
        assert_eq!(config.logging.level, "warn");
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_load_expands_home() {
        let home = tempfile::tempdir().unwrap();
        let config = load_with_env(None, Some(home.path()), &no_env()).unwrap();
        assert_eq!(
            config.storage.path,
            Some(home.path().join(".keystash").join("data"))
        );
    }

    #[test]
    fn test_precedence_user_then_explicit_then_env() {
        let home = tempfile::tempdir().unwrap();
        let user_dir = home.path().join(".keystash");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(
            user_dir.join("config.toml"),
            "[storage]\nroot_key = \"user\"\nbackend = \"memory\"\n",
        )
        .unwrap();

        let explicit = home.path().join("explicit.toml");
        std::fs::write(&explicit, "[storage]\nroot_key = \"explicit\"\n").unwrap();

        let config = load_with_env(Some(&explicit), Some(home.path()), &no_env()).unwrap();
        assert_eq!(config.storage.root_key, "explicit");
        assert_eq!(config.storage.backend, BackendKind::Memory);

        let env = HashMap::from([
            ("KEYSTASH_ROOT_KEY".to_owned(), "env".to_owned()),
            ("KEYSTASH_LOG".to_owned(), "debug".to_owned()),
        ]);
        let config = load_with_env(Some(&explicit), Some(home.path()), &env).unwrap();
        assert_eq!(config.storage.root_key, "env");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("nope.toml");
        let err = load_with_env(Some(&missing), Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let home = tempfile::tempdir().unwrap();
        let path = home.path().join("bad.toml");
        std::fs::write(&path, "[storage\nroot_key = 1").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let home = tempfile::tempdir().unwrap();
        let path = home.path().join("big.toml");
        let padding = "#".repeat(1_048_577);
        std::fs::write(&path, padding).unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_load_file_with_models() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.toml");
        std::fs::write(
            &path,
            r#"
            [storage]
            backend = "memory"

            [models.post]
            belongs_to = { author = "author" }

            [models.author]
            has_many = { posts = "post" }
            "#,
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models["post"].belongs_to["author"], "author");
    }

    #[test]
    fn test_load_file_expands_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.toml");
        std::fs::write(&path, "[storage]\nroot_key = \"x\"\n").unwrap();

        let config = load_file(&path).unwrap();
        let data = config.storage.path.unwrap();
        assert!(!data.starts_with("~"));
        assert!(data.is_absolute());
        assert!(data.ends_with(".keystash/data"));
    }

    #[test]
    fn test_load_file_keeps_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explicit.toml");
        std::fs::write(&path, "[storage]\npath = \"/srv/keystash\"\n").unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.storage.path, Some(PathBuf::from("/srv/keystash")));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        let home = Path::new("/home/u");
        assert_eq!(expand_home(Path::new("/data"), home), PathBuf::from("/data"));
        assert_eq!(
            expand_home(Path::new("~/data"), home),
            PathBuf::from("/home/u/data")
        );
    }
}
