//! Keystash Telemetry - logging setup for keystash binaries.
//!
//! Library crates only emit `tracing` events. A binary decides where they go
//! by building a [`LogConfig`] and calling [`setup_logging`] once at start-up.
//!
//! # Example
//!
//! ```rust,no_run
//! use keystash_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), keystash_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("keystash_core=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
