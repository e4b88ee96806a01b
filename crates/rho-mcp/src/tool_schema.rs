use std::sync::Arc;

use tracing::{error, warn};

use rho_agent_core::ChatToolParam;

use crate::client::{McpClient, McpError};

/// Tool names exposed to the agent's chat-completion schema.
///
/// Discovery can surface many more tools, but only these search tools are
/// converted; everything else is dropped here.
pub const SEARCH_TOOL_NAMES: &[&str] = &["search_issues", "search_repositories", "search_code"];

pub(crate) const SEARCH_ISSUES_TOOL: &str = "search_issues";

const EVALUATION_DISCLOSURE_NOTE: &str =
    " (Note: Current SWE-bench task issues are filtered out for evaluation purposes)";

/// Flattens every connected client's tool manifest into chat-completion
/// tool parameters.
///
/// An absent pool yields an empty list with a warning. Conversion is
/// fail-closed: a malformed tool descriptor empties the whole output rather
/// than producing a partial schema.
pub fn convert_mcp_clients_to_tools(
    mcp_clients: Option<&[Arc<dyn McpClient>]>,
) -> Vec<ChatToolParam> {
    let Some(mcp_clients) = mcp_clients else {
        warn!("mcp client pool is absent, returning empty tool list");
        return Vec::new();
    };

    match convert_clients(mcp_clients) {
        Ok(tools) => tools,
        Err(convert_error) => {
            error!(
                error = %convert_error,
                "error converting MCP tools to chat tool schema"
            );
            Vec::new()
        }
    }
}

fn convert_clients(mcp_clients: &[Arc<dyn McpClient>]) -> Result<Vec<ChatToolParam>, McpError> {
    let mut all_mcp_tools = Vec::new();
    for client in mcp_clients {
        for tool in client.tools() {
            if !SEARCH_TOOL_NAMES.contains(&tool.name.as_str()) {
                continue;
            }
            if !tool.input_schema.is_object() {
                return Err(McpError::InvalidPayload {
                    server: client.server_url().to_string(),
                    detail: format!("tool '{}' parameter schema is not an object", tool.name),
                });
            }
            let mut description = tool.description.clone();
            if tool.name == SEARCH_ISSUES_TOOL {
                description.push_str(EVALUATION_DISCLOSURE_NOTE);
            }
            all_mcp_tools.push(ChatToolParam::function(
                tool.name.clone(),
                description,
                tool.input_schema.clone(),
            ));
        }
    }
    Ok(all_mcp_tools)
}
