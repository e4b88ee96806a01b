use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use rho_swe_bench::{filter_issues, SweBenchContext};

use crate::client::{McpClient, McpError};
use crate::tool_schema::SEARCH_ISSUES_TOOL;

/// Feature flag enabling `search_issues` interception during SWE-Bench
/// evaluation. Set to "true" (case-insensitive) to enable; any other value,
/// including unset, disables it.
pub const SWE_BENCH_FILTER_ENV: &str = "SWE_BENCH_MCP_FILTER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A tool invocation requested by the agent.
pub struct McpAction {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl McpAction {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Uniform observation envelope around any tool response.
pub struct McpObservation {
    /// JSON-serialized tool response.
    pub content: String,
}

impl McpObservation {
    fn from_value(value: &Value) -> Result<Self, McpError> {
        Ok(Self {
            content: serde_json::to_string(value)?,
        })
    }
}

pub fn swe_bench_filter_enabled() -> bool {
    std::env::var(SWE_BENCH_FILTER_ENV)
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Routes a tool invocation to the client that owns the tool.
///
/// `search_issues` goes through the SWE-Bench filtered path; everything
/// else is dispatched to the first client (in pool order) exposing the
/// requested tool name.
pub async fn call_tool_mcp(
    mcp_clients: &[Arc<dyn McpClient>],
    context: &SweBenchContext,
    action: &McpAction,
) -> Result<McpObservation, McpError> {
    if mcp_clients.is_empty() {
        return Err(McpError::NoClients);
    }
    debug!(tool_name = action.name.as_str(), "MCP action received");

    if action.name == SEARCH_ISSUES_TOOL {
        return call_search_issues_with_filter(mcp_clients, context, action).await;
    }
    dispatch_direct(mcp_clients, action).await
}

async fn dispatch_direct(
    mcp_clients: &[Arc<dyn McpClient>],
    action: &McpAction,
) -> Result<McpObservation, McpError> {
    let matching_client = mcp_clients
        .iter()
        .find(|client| client.has_tool(&action.name))
        .ok_or_else(|| McpError::NoMatchingTool(action.name.clone()))?;

    let response = matching_client
        .call_tool(&action.name, action.arguments.clone())
        .await?;
    McpObservation::from_value(&response)
}

/// Invokes `search_issues` and hides the active benchmark task's own issue
/// from the result.
///
/// With the feature flag disabled this is a plain direct dispatch.
async fn call_search_issues_with_filter(
    mcp_clients: &[Arc<dyn McpClient>],
    context: &SweBenchContext,
    action: &McpAction,
) -> Result<McpObservation, McpError> {
    if !swe_bench_filter_enabled() {
        return dispatch_direct(mcp_clients, action).await;
    }

    let task = context.current_task();
    if let Some(instance_id) = task.instance_id.as_deref() {
        info!(
            instance_id,
            repo = ?task.owner_repo,
            issue_number = ?task.issue_number,
            "filtering GitHub issues for SWE-Bench task"
        );
    }

    let matching_client = mcp_clients
        .iter()
        .find(|client| client.has_tool(SEARCH_ISSUES_TOOL))
        .ok_or_else(|| McpError::NoMatchingTool(SEARCH_ISSUES_TOOL.to_string()))?;

    let mut response = matching_client
        .call_tool(&action.name, action.arguments.clone())
        .await?;

    if let Some(items) = response.get("items").and_then(Value::as_array).cloned() {
        let original_count = items.len();
        let filtered = filter_issues(&task, &items);
        let filtered_count = filtered.len();
        if let Some(object) = response.as_object_mut() {
            object.insert("items".to_string(), Value::Array(filtered));
            object.insert("total_count".to_string(), json!(filtered_count));
            if filtered_count < original_count {
                let blocked_count = original_count - filtered_count;
                object.insert(
                    "filter_note".to_string(),
                    Value::String(format!(
                        "Filtered {blocked_count} SWE-Bench task issue(s) for evaluation purposes"
                    )),
                );
                info!(
                    blocked_count,
                    "filtered SWE-Bench task issue(s) from search results"
                );
            }
        }
    }

    McpObservation::from_value(&response)
}
