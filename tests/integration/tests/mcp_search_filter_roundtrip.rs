use std::sync::{Arc, Mutex, MutexGuard};

use httpmock::{Method::POST, MockServer};
use serde_json::{json, Value};

use rho_agent_core::{Agent, AgentConfig};
use rho_config::{McpConfig, McpSseServerConfig};
use rho_mcp::{
    add_mcp_tools_to_agent, call_tool_mcp, create_mcp_clients, McpAction, McpClient,
    SWE_BENCH_FILTER_ENV,
};
use rho_runtime::ActionExecutionRuntime;
use rho_swe_bench::SweBenchContext;

/// Serializes tests that flip the filter feature flag.
static ENV_LOCK: Mutex<()> = Mutex::new(());

struct FilterFlagGuard {
    _lock: MutexGuard<'static, ()>,
    previous: Option<String>,
}

impl FilterFlagGuard {
    fn set(value: &str) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::env::var(SWE_BENCH_FILTER_ENV).ok();
        std::env::set_var(SWE_BENCH_FILTER_ENV, value);
        Self {
            _lock: lock,
            previous,
        }
    }
}

impl Drop for FilterFlagGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => std::env::set_var(SWE_BENCH_FILTER_ENV, previous),
            None => std::env::remove_var(SWE_BENCH_FILTER_ENV),
        }
    }
}

async fn mock_github_mcp_server(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/mcp")
                .body_includes("\"method\":\"initialize\"");
            then.status(200)
                .header("Mcp-Session-Id", "integration-session")
                .json_body(json!({
                    "jsonrpc": "2.0",
                    "id": "rho-client-init",
                    "result": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": { "tools": { "listChanged": false } }
                    }
                }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/mcp")
                .body_includes("\"method\":\"tools/list\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": "rho-client-tools-list",
                "result": {
                    "tools": [
                        {
                            "name": "search_issues",
                            "description": "Search GitHub issues",
                            "inputSchema": { "type": "object", "properties": { "q": { "type": "string" } } }
                        },
                        {
                            "name": "search_code",
                            "description": "Search code",
                            "inputSchema": { "type": "object", "properties": { "q": { "type": "string" } } }
                        },
                        {
                            "name": "fetch",
                            "description": "Fetch a URL",
                            "inputSchema": { "type": "object", "properties": { "url": { "type": "string" } } }
                        }
                    ]
                }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/mcp")
                .body_includes("\"method\":\"tools/call\"")
                .body_includes("\"name\":\"search_issues\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": "rho-client-tools-call",
                "result": {
                    "total_count": 3,
                    "items": [
                        { "number": 41, "repository": { "full_name": "psf/requests" } },
                        { "number": 42, "repository": { "full_name": "psf/requests" } },
                        { "number": 42, "repository_url": "https://api.github.com/repos/psf/urllib3" }
                    ]
                }
            }));
        })
        .await;
}

fn decoded_content(content: &str) -> Value {
    serde_json::from_str(content).expect("observation content is JSON")
}

#[tokio::test]
async fn integration_pool_schema_and_agent_wiring_roundtrip() {
    let server = MockServer::start_async().await;
    mock_github_mcp_server(&server).await;

    let mut agent = Agent::new(AgentConfig::default());
    let mut runtime = ActionExecutionRuntime::new("http://127.0.0.1:1", None);
    runtime.mark_initialized();
    let config = McpConfig::new(vec![McpSseServerConfig::new(server.url("/mcp"))]);

    add_mcp_tools_to_agent(&mut agent, &runtime, &config)
        .await
        .expect("wiring succeeds");

    // Search tools survive adaptation; other discovered tools do not.
    assert!(agent.has_mcp_tool("search_issues"));
    assert!(agent.has_mcp_tool("search_code"));
    assert!(!agent.has_mcp_tool("fetch"));

    let search_issues = &agent.mcp_tools()[0];
    assert!(search_issues
        .function
        .description
        .ends_with("filtered out for evaluation purposes)"));
}

#[tokio::test]
async fn integration_search_issues_dispatch_filters_active_task_issue() {
    let _flag = FilterFlagGuard::set("true");
    let server = MockServer::start_async().await;
    mock_github_mcp_server(&server).await;

    let context = SweBenchContext::new();
    context.set_current_task("psf__requests-42");

    let clients: Vec<Arc<dyn McpClient>> =
        create_mcp_clients(&[McpSseServerConfig::new(server.url("/mcp"))]).await;
    assert_eq!(clients.len(), 1);

    let observation = call_tool_mcp(
        &clients,
        &context,
        &McpAction::new("search_issues", json!({ "q": "bug" })),
    )
    .await
    .expect("dispatch succeeds");

    let content = decoded_content(&observation.content);
    assert_eq!(content["total_count"], 2);
    let numbers = content["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["number"].as_u64().expect("issue number"))
        .collect::<Vec<_>>();
    // psf/requests#42 is hidden; psf/urllib3#42 survives on repo mismatch.
    assert_eq!(numbers, vec![41, 42]);
    assert_eq!(
        content["filter_note"],
        "Filtered 1 SWE-Bench task issue(s) for evaluation purposes"
    );
}

#[tokio::test]
async fn integration_search_issues_dispatch_is_untouched_when_flag_disabled() {
    let _flag = FilterFlagGuard::set("false");
    let server = MockServer::start_async().await;
    mock_github_mcp_server(&server).await;

    let context = SweBenchContext::new();
    context.set_current_task("psf__requests-42");

    let clients: Vec<Arc<dyn McpClient>> =
        create_mcp_clients(&[McpSseServerConfig::new(server.url("/mcp"))]).await;

    let observation = call_tool_mcp(
        &clients,
        &context,
        &McpAction::new("search_issues", json!({ "q": "bug" })),
    )
    .await
    .expect("dispatch succeeds");

    let content = decoded_content(&observation.content);
    assert_eq!(content["total_count"], 3);
    assert_eq!(content["items"].as_array().map(Vec::len), Some(3));
    assert!(content.get("filter_note").is_none());
}
