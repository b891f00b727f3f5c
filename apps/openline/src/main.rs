//! # OpenLine - Frame Bus
//!
//! The main binary for the OpenLine frame bus.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for extraction, digests and offline checks
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    apps/openline (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │   HTTP API  │    │  Config (TOML)   │   │
//! │  │  (clap)     │    │   (axum)    │    │  + env overrides │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘   │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                   ┌─────────────────┐                          │
//! │                   │  openline-core  │                          │
//! │                   │   (THE LOGIC)   │                          │
//! │                   └─────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! openline serve --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! openline extract --text "Because trials show an effect, we proceed."
//! openline digest -f frame.json
//! openline check -f frame.json --prior digest.json
//! openline schema --hash
//! ```

use clap::Parser;
use openline::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing on stderr; OPENLINE_LOG_FORMAT=json enables machine-parseable output.
    // Stdout carries command output.
    let log_format = std::env::var("OPENLINE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "openline=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the OpenLine startup banner.
fn print_banner() {
    eprintln!(
        r#"
   ___                   _     _
  / _ \ _ __   ___ _ __ | |   (_)_ __   ___
 | | | | '_ \ / _ \ '_ \| |   | | '_ \ / _ \
 | |_| | |_) |  __/ | | | |___| | | | |  __/
  \___/| .__/ \___|_| |_|_____|_|_| |_|\___|
       |_|

  Frame Bus v{}

  Extract • Digest • Guard
"#,
        env!("CARGO_PKG_VERSION")
    );
}
