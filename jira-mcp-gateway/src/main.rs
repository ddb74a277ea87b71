//! Jira MCP Gateway - Jira issue tracker tools over MCP
//!
//! Serves the gateway over STDIO. Configuration comes from
//! `jira-mcp-config.toml` and the `JIRA_*` environment variables.

use jira_mcp_gateway::JiraMcpServer;
use pulseengine_mcp_server::McpServerBuilder;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure logging for STDIO transport
    JiraMcpServer::configure_stdio_logging();

    info!("Starting Jira MCP Gateway...");

    let jira_server = match JiraMcpServer::new() {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create Jira MCP Gateway: {}", e);
            eprintln!("Failed to start Jira MCP Gateway: {}", e);
            eprintln!("\nPlease check:");
            eprintln!("  - JIRA_URL is a valid http(s) URL");
            eprintln!("  - JIRA authentication is configured (JIRA_AUTH_TYPE, JIRA_TOKEN, etc.)");
            eprintln!("  - jira-mcp-config.toml, if present, is valid TOML");
            std::process::exit(1);
        }
    };

    let read_only = jira_server.dispatcher().resolver().is_read_only();
    info!(
        "Serving {} tools (read-only: {})",
        jira_server.dispatcher().available_tools().len(),
        read_only
    );

    let mut server = jira_server.serve_stdio().await?;

    info!("Jira MCP Gateway is running and ready to serve requests");

    server.run().await?;

    Ok(())
}
