//! Subcommand implementations.
//!
//! Every command returns the JSON value `main` prints to stdout.

pub(crate) mod read;
pub(crate) mod write;
