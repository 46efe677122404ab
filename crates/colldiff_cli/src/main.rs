//! colldiff CLI
//!
//! Command-line consistency checks over document dumps.
//!
//! # Commands
//!
//! - `diff` - Diff two collection dumps by key
//! - `check-indexes` - Report indexes that differ across replicas
//! - `hash` - Hash a collection dump
//!
//! Dumps are JSON arrays (or one JSON document per line) using extended JSON
//! wrappers for typed numbers, dates and binary data.

mod commands;
mod json;

use clap::{Parser, Subcommand};
use colldiff_core::DEFAULT_KEY_FIELD;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// colldiff command-line consistency tools.
#[derive(Parser)]
#[command(name = "colldiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two collection dumps
    Diff {
        /// Dump of the source (reference) copy
        #[arg(long)]
        source: PathBuf,

        /// Dump of the syncing copy
        #[arg(long)]
        syncing: PathBuf,

        /// Identity field used to align documents
        #[arg(short, long, default_value = DEFAULT_KEY_FIELD)]
        key: String,

        /// Sort both dumps by key before diffing
        #[arg(short, long)]
        sort: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check index consistency across replicas
    CheckIndexes {
        /// Catalog dump: namespace -> replica -> index specs
        #[arg(short, long)]
        catalog: PathBuf,

        /// Attempts per catalog query
        #[arg(short, long, default_value = "3")]
        retries: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Hash a collection dump
    Hash {
        /// Dump to hash
        #[arg(short, long)]
        input: PathBuf,

        /// Identity field used for sorting
        #[arg(short, long, default_value = DEFAULT_KEY_FIELD)]
        key: String,

        /// Sort the dump by key before hashing
        #[arg(short, long)]
        sort: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff {
            source,
            syncing,
            key,
            sort,
            format,
        } => {
            commands::diff::run(&source, &syncing, &key, sort, &format)?;
        }
        Commands::CheckIndexes {
            catalog,
            retries,
            format,
        } => {
            commands::check_indexes::run(&catalog, retries, &format)?;
        }
        Commands::Hash {
            input,
            key,
            sort,
            format,
        } => {
            commands::hash::run(&input, &key, sort, &format)?;
        }
        Commands::Version => {
            println!("colldiff CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("colldiff Core v{}", colldiff_core::VERSION);
        }
    }

    Ok(())
}
