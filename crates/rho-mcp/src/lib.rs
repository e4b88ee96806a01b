//! MCP client integration for Rho agents.
//!
//! Builds a pool of SSE-backed MCP clients from configuration, flattens
//! their advertised tools into the chat-completion tool schema, dispatches
//! tool-call actions to the owning client, and intercepts `search_issues`
//! during SWE-Bench evaluation so the active task's own issue never reaches
//! the agent.

pub mod client;
pub mod dispatch;
#[cfg(test)]
pub(crate) mod testing;
pub mod tool_schema;
pub mod wiring;

pub use client::{create_mcp_clients, McpClient, McpError, McpToolDescriptor, SseMcpClient};
pub use dispatch::{
    call_tool_mcp, swe_bench_filter_enabled, McpAction, McpObservation, SWE_BENCH_FILTER_ENV,
};
pub use tool_schema::{convert_mcp_clients_to_tools, SEARCH_TOOL_NAMES};
pub use wiring::{add_mcp_tools_to_agent, fetch_mcp_tools_from_config};
