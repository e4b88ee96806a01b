//! Action-execution runtime companion for Rho agents.
//!
//! The runtime executes agent actions inside a sandbox and, once
//! initialized, doubles as an MCP tool server of its own. This crate models
//! the surface the MCP wiring consumes: the initialization flag and the
//! config update that advertises the runtime's SSE endpoint.

use tracing::debug;

use rho_config::{McpConfig, McpSseServerConfig};

/// Client handle for a sandboxed action-execution runtime.
#[derive(Debug, Clone)]
pub struct ActionExecutionRuntime {
    runtime_url: String,
    session_api_key: Option<String>,
    runtime_initialized: bool,
}

impl ActionExecutionRuntime {
    /// Creates a handle for the runtime at `runtime_url`. The runtime starts
    /// uninitialized; callers flip the flag once the sandbox is ready.
    pub fn new(runtime_url: impl Into<String>, session_api_key: Option<String>) -> Self {
        Self {
            runtime_url: runtime_url.into(),
            session_api_key,
            runtime_initialized: false,
        }
    }

    pub fn runtime_initialized(&self) -> bool {
        self.runtime_initialized
    }

    pub fn mark_initialized(&mut self) {
        self.runtime_initialized = true;
    }

    /// The runtime's own MCP SSE endpoint.
    pub fn mcp_sse_url(&self) -> String {
        format!("{}/mcp/sse", self.runtime_url.trim_end_matches('/'))
    }

    /// Returns `base` extended with the runtime itself as one more tool
    /// server, authenticated with the session API key.
    pub fn updated_mcp_config(&self, base: &McpConfig) -> McpConfig {
        let mut updated = base.clone();
        let server = McpSseServerConfig {
            url: self.mcp_sse_url(),
            api_key: self.session_api_key.clone(),
        };
        debug!(url = server.url.as_str(), "advertising runtime as MCP server");
        updated.sse_servers.push(server);
        updated
    }
}
