use anyhow::Context;
use freshdesk_mcp::server::{serve, McpServer};
use freshdesk_mcp::{Config, FreshdeskClient, ToolContext, ToolRegistry};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout is the protocol channel.
/// Set `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::load().context("invalid Freshdesk configuration")?;
    let client = Arc::new(FreshdeskClient::new(&config)?);
    info!("Freshdesk MCP server starting against {}", client.base_url());

    let server = Arc::new(McpServer::new(
        ToolRegistry::with_defaults(),
        ToolContext::new(client),
    ));

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = serve(server, stdin, tokio::io::stdout()) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    info!("Freshdesk MCP server stopped");
    Ok(())
}
