//! # OpenLine MCP Server
//!
//! Entry point for the MCP (Model Context Protocol) bridge to OpenLine.
//!
//! Reads configuration from environment variables:
//! - `OPENLINE_URL`: OpenLine server URL (default: `http://localhost:8080`)
//!
//! Communicates with agents via MCP over stdio and forwards requests to the
//! OpenLine HTTP API.

mod client;
mod server;

use client::OpenlineClient;
use rmcp::{ServiceExt, transport::stdio};
use server::OpenlineMcp;

const DEFAULT_OPENLINE_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging to stderr only; stdout is reserved for MCP stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openline_mcp=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let url = std::env::var("OPENLINE_URL").unwrap_or_else(|_| DEFAULT_OPENLINE_URL.into());
    let client = OpenlineClient::new(url.clone());

    // The bus may come up after the bridge; tools report the failure per call.
    match client.health().await {
        Ok(_) => tracing::info!(%url, "OpenLine frame bus reachable"),
        Err(e) => tracing::warn!(%url, "OpenLine frame bus not reachable yet: {e}"),
    }

    let mcp = OpenlineMcp::new(client);

    let service = mcp.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP serve error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}
