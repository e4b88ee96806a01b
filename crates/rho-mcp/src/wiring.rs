use anyhow::{ensure, Result};
use tracing::{debug, error, info};

use rho_agent_core::{Agent, ChatToolParam};
use rho_config::McpConfig;
use rho_runtime::ActionExecutionRuntime;

use crate::client::create_mcp_clients;
use crate::tool_schema::convert_mcp_clients_to_tools;

/// Connects to every configured server, adapts the discovered tools to the
/// chat-completion schema, and tears the connections back down.
///
/// Discovery connections are not kept alive; later tool calls re-establish
/// their own sessions. Any failure degrades to an empty list, logged.
pub async fn fetch_mcp_tools_from_config(mcp_config: &McpConfig) -> Vec<ChatToolParam> {
    debug!(
        server_count = mcp_config.sse_servers.len(),
        "creating MCP clients from config"
    );
    let mcp_clients = create_mcp_clients(&mcp_config.sse_servers).await;
    if mcp_clients.is_empty() {
        debug!("no MCP clients were successfully connected");
        return Vec::new();
    }

    let mcp_tools = convert_mcp_clients_to_tools(Some(&mcp_clients));

    for client in &mcp_clients {
        if let Err(disconnect_error) = client.disconnect().await {
            error!(
                url = client.server_url(),
                error = %disconnect_error,
                "error disconnecting MCP client"
            );
        }
    }

    mcp_tools
}

/// Wires MCP tools onto an agent.
///
/// The runtime must have finished initializing, since it is advertised as
/// one more tool server in the effective configuration.
pub async fn add_mcp_tools_to_agent(
    agent: &mut Agent,
    runtime: &ActionExecutionRuntime,
    mcp_config: &McpConfig,
) -> Result<()> {
    ensure!(
        runtime.runtime_initialized(),
        "runtime must be initialized before adding MCP tools"
    );

    let updated_mcp_config = runtime.updated_mcp_config(mcp_config);
    let mcp_tools = fetch_mcp_tools_from_config(&updated_mcp_config).await;

    info!(
        count = mcp_tools.len(),
        tool_names = ?mcp_tools
            .iter()
            .map(ChatToolParam::function_name)
            .collect::<Vec<_>>(),
        "loaded MCP tools"
    );

    agent.set_mcp_tools(mcp_tools);
    Ok(())
}
