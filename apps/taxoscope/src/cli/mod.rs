//! # Taxoscope CLI Module
//!
//! This module implements the CLI interface for Taxoscope.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `root` - Show the root taxon
//! - `taxon` - Show one taxon with its summary
//! - `children` - List the immediate children of a taxon
//! - `explore` - Expand the taxonomy headlessly to a given depth
//! - `ranks` - Show the rank hierarchy table

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taxoscope_core::TaxoError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Taxoscope - lazy, interactive taxonomy graph
///
/// Starts from a single root taxon and materializes lower ranks on demand
/// from a rank-partitioned ArangoDB store.
#[derive(Parser, Debug)]
#[command(name = "taxoscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve from a JSON fixture instead of ArangoDB
    #[arg(short = 'F', long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory of renderer assets to serve at /
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show the root taxon
    Root,

    /// Show one taxon with its summary
    Taxon {
        /// Rank of the taxon (kingdom, phylum, ...)
        rank: String,

        /// Document key within the rank's collection
        key: String,
    },

    /// List the immediate children of a taxon
    Children {
        /// Rank of the parent taxon
        rank: String,

        /// Document key within the rank's collection
        key: String,
    },

    /// Expand the taxonomy from the root, level by level
    Explore {
        /// Number of levels to expand
        #[arg(short, long, default_value = "2")]
        depth: usize,

        /// Seconds to wait for each level's fetches
        #[arg(long, default_value = "30")]
        timeout: u64,
    },

    /// Show the rank hierarchy table
    Ranks,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TaxoError> {
    let config = Config::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;
    let fixture = cli.fixture.as_deref();

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            static_dir,
        }) => cmd_serve(config, fixture, host, port, static_dir).await,
        Some(Commands::Root) => cmd_root(&config, fixture, json_mode).await,
        Some(Commands::Taxon { rank, key }) => {
            cmd_taxon(&config, fixture, json_mode, &rank, &key).await
        }
        Some(Commands::Children { rank, key }) => {
            cmd_children(&config, fixture, json_mode, &rank, &key).await
        }
        Some(Commands::Explore { depth, timeout }) => {
            cmd_explore(&config, fixture, json_mode, cli.verbose, depth, timeout).await
        }
        Some(Commands::Ranks) => cmd_ranks(&config, json_mode, cli.verbose),
        None => {
            // No subcommand - show the rank table by default
            cmd_ranks(&config, json_mode, cli.verbose)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
