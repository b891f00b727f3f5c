//! # OpenLine CLI Module
//!
//! This module implements the CLI interface for OpenLine.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `extract` - Build a frame from text
//! - `digest` - Recompute the digest of a frame file
//! - `check` - Validate and guard a frame file offline
//! - `schema` - Print or write the JSON Schema bundle

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use openline_core::OpenlineError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// OpenLine - frame bus for argumentation graphs
///
/// Turns text into typed argument graphs, fingerprints them and guards
/// every transition of a stream.
#[derive(Parser, Debug)]
#[command(name = "openline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file (default: ./openline.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (overrides [server] host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build a frame from text and print it
    Extract {
        /// Text to extract from
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// File containing the text
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Stream id of the built frame
        #[arg(short, long, default_value = "cli")]
        stream: String,

        /// Logical time of the built frame
        #[arg(long, default_value = "1")]
        time: u64,
    },

    /// Recompute the digest of a frame file
    Digest {
        /// Frame JSON (bare or wrapped as {"frame": ...})
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate a frame file and run the guards without committing
    Check {
        /// Frame JSON (bare or wrapped as {"frame": ...})
        #[arg(short, long)]
        file: PathBuf,

        /// Digest JSON the frame is checked against
        #[arg(long)]
        prior: Option<PathBuf>,
    },

    /// Print the JSON Schema bundle
    Schema {
        /// Print only the BLAKE3 fingerprint
        #[arg(long)]
        hash: bool,

        /// Write the bundle to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), OpenlineError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let verbose = cli.verbose;

    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(config, host, port).await,
        Some(Commands::Extract {
            text,
            file,
            stream,
            time,
        }) => cmd_extract(&config, text, file, &stream, time, verbose),
        Some(Commands::Digest { file }) => cmd_digest(&config, &file, verbose),
        Some(Commands::Check { file, prior }) => {
            cmd_check(&config, &file, prior.as_deref(), verbose)
        }
        Some(Commands::Schema { hash, output }) => cmd_schema(hash, output.as_deref()),
        None => {
            // No subcommand - serve with the loaded configuration
            cmd_serve(config, None, None).await
        }
    }
}
