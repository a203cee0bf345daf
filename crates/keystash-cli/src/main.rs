//! Keystash CLI - inspect and edit a record store from the shell.
//!
//! Loads the layered configuration, opens the configured storage medium,
//! runs one command against a local adapter and prints the result as JSON.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keystash_config::StashConfig;
use keystash_core::{LocalAdapter, generate_id};
use keystash_events::EventBus;
use tracing::warn;

mod commands;
mod config_bridge;

use commands::read::{self, Output};
use commands::write;

/// Keystash - JSON record store over a single key-value entry
#[derive(Parser)]
#[command(name = "keystash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a configuration file layered over the user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as normalized `{data, included}` documents
    #[arg(long, global = true)]
    extract: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole root document
    Dump,

    /// Fetch one record with its related records embedded
    Find {
        /// Model name
        model: String,
        /// Record id
        id: String,
        /// Do not embed related records
        #[arg(long)]
        flat: bool,
    },

    /// Fetch several records; fails if any id is missing
    Many {
        /// Model name
        model: String,
        /// Record ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Do not embed related records
        #[arg(long)]
        flat: bool,
    },

    /// List every record of a model
    All {
        /// Model name
        model: String,
    },

    /// Find records matching `<field>=<value>` and `<field>~<regex>` terms
    Query {
        /// Model name
        model: String,
        /// Query terms, all of which must match
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Create or update a record from a JSON object
    Put {
        /// Model name
        model: String,
        /// Record JSON
        json: String,
    },

    /// Delete a record
    Delete {
        /// Model name
        model: String,
        /// Record id
        id: String,
    },

    /// Print a fresh record id
    GenId,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = StashConfig::load(cli.config.as_deref())?;

    let mut log_config = config_bridge::to_log_config(&config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = keystash_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if matches!(cli.command, Commands::GenId) {
        println!("{}", generate_id());
        return Ok(());
    }

    let storage = Arc::new(config_bridge::to_storage_handle(
        &config.storage,
        EventBus::new(),
    ));
    let adapter = LocalAdapter::new(
        Arc::clone(&storage),
        Arc::new(config_bridge::to_schema(&config)),
        config_bridge::to_adapter_options(&config),
    );

    let result = run(&adapter, cli.command, Output::from_flag(cli.extract)).await;

    if storage.is_fallback() {
        warn!("storage medium unavailable; changes were kept in memory only");
    }
    storage.close().await?;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

async fn run(
    adapter: &LocalAdapter,
    command: Commands,
    output: Output,
) -> Result<serde_json::Value> {
    match command {
        Commands::Dump => read::dump(adapter).await,
        Commands::Find { model, id, flat } => {
            read::find(adapter, &model, &id, flat, output).await
        },
        Commands::Many { model, ids, flat } => {
            read::many(adapter, &model, &ids, flat, output).await
        },
        Commands::All { model } => read::all(adapter, &model, output).await,
        Commands::Query { model, terms } => read::query(adapter, &model, &terms, output).await,
        Commands::Put { model, json } => write::put(adapter, &model, &json).await,
        Commands::Delete { model, id } => write::delete(adapter, &model, &id).await,
        Commands::GenId => Ok(serde_json::Value::String(generate_id())),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use keystash_test::seeded_adapter;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_with_global_flags() {
        let cli = Cli::try_parse_from([
            "keystash",
            "query",
            "post",
            "title~^Hello",
            "views=3",
            "--extract",
            "-c",
            "/tmp/k.toml",
        ])
        .unwrap();

        assert!(cli.extract);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/k.toml")));
        match cli.command {
            Commands::Query { model, terms } => {
                assert_eq!(model, "post");
                assert_eq!(terms, vec!["title~^Hello", "views=3"]);
            },
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_parse_gen_id_and_required_ids() {
        let cli = Cli::try_parse_from(["keystash", "gen-id"]).unwrap();
        assert!(matches!(cli.command, Commands::GenId));
        assert!(Cli::try_parse_from(["keystash", "many", "post"]).is_err());
    }

    #[tokio::test]
    async fn test_run_dispatches() {
        let adapter = seeded_adapter().await;
        let value = run(
            &adapter,
            Commands::Find {
                model: "author".into(),
                id: "a2".into(),
                flat: true,
            },
            Output::Payload,
        )
        .await
        .unwrap();
        assert_eq!(value["name"], json!("Bob"));
    }
}
