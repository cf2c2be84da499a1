//! Ripple MCP server binary.
//!
//! Runs the MCP server over stdio for use with AI assistants.

use ripple_mcp::RippleMcpServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ripple=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ripple-mcp server");

    let server = RippleMcpServer::new();
    server.run().await?;

    Ok(())
}
