//! Command-line interface.

pub mod get;
pub mod output;
pub mod sources;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::constants::{SETTINGS_ENV, SETTINGS_FILE};

/// Configurations - layered configuration and secret lookups.
#[derive(Parser)]
#[command(
    name = "configurations",
    about = "Resolve configuration values across layered sources",
    version
)]
pub struct Cli {
    /// Settings file listing the sources to consult
    #[arg(long, global = true, env = SETTINGS_ENV, default_value = SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Resolve a value and print it
    Get {
        /// Name to resolve (e.g., DATABASE_URL)
        name: String,
        /// Value printed when no source defines the name
        #[arg(short, long)]
        default: Option<String>,
        /// Interpretation applied before printing
        #[arg(long = "as", value_enum, default_value = "string")]
        coercion: Coercion,
    },

    /// List sources in resolution order
    Sources {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// How `get` interprets the resolved value.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coercion {
    String,
    Boolean,
    Number,
    Object,
}

/// Execute a command against the settings at `settings`.
pub async fn execute(command: Command, settings: PathBuf) -> crate::error::Result<()> {
    match command {
        Command::Get {
            name,
            default,
            coercion,
        } => get::execute(&settings, &name, default, coercion).await,
        Command::Sources { json } => sources::execute(&settings, json).await,
    }
}
