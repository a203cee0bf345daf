//! Keystash Config - layered TOML configuration.
//!
//! ```rust,no_run
//! use keystash_config::StashConfig;
//!
//! let config = StashConfig::load(None).unwrap();
//! println!("root key: {}", config.storage.root_key);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment** (`KEYSTASH_ROOT_KEY`, `KEYSTASH_BACKEND`,
//!    `KEYSTASH_PATH`, `KEYSTASH_LOG`)
//! 2. **Explicit file** passed by the caller
//! 3. **User** (`~/.keystash/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other keystash crate. Turning a [`StashConfig`]
//! into storage handles, log setup and model schemas is left to the binary.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// `KEYSTASH_*` environment overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layer merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Post-merge validation.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{BackendKind, LoggingSection, ModelSection, StashConfig, StorageSection};

impl StashConfig {
    /// Load with the full precedence chain, optionally layering `explicit`
    /// above the user file.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(explicit, None)
    }

    /// Load a single file over the built-in defaults.
    ///
    /// # Errors
    ///
    /// See [`loader::load_file`].
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
