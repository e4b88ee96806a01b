use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use rho_config::McpSseServerConfig;

const MCP_JSONRPC_VERSION: &str = "2.0";
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SESSION_HEADER: &str = "Mcp-Session-Id";
const MCP_INIT_REQUEST_ID: &str = "rho-client-init";
const MCP_TOOLS_LIST_REQUEST_ID: &str = "rho-client-tools-list";
const MCP_TOOLS_CALL_REQUEST_ID: &str = "rho-client-tools-call";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Error)]
/// Enumerates supported `McpError` values.
pub enum McpError {
    #[error("no MCP clients found")]
    NoClients,
    #[error("no matching MCP client found for tool name: {0}")]
    NoMatchingTool(String),
    #[error("mcp server '{server}' request failed: {source}")]
    Transport {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("mcp server '{server}' returned status {status}: {body}")]
    Upstream {
        server: String,
        status: u16,
        body: String,
    },
    #[error("mcp server '{server}' returned json-rpc error code={code} message={message}")]
    JsonRpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("mcp server '{server}' returned invalid payload: {detail}")]
    InvalidPayload { server: String, detail: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
/// Tool manifest entry advertised by a connected MCP server.
pub struct McpToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Seam trait for a connected MCP tool server.
///
/// The dispatcher and schema adapter only see this surface; tests exercise
/// them with in-process fakes while production uses [`SseMcpClient`].
#[async_trait]
pub trait McpClient: Send + Sync {
    /// URL of the server this client is connected to.
    fn server_url(&self) -> &str;

    /// Tools advertised by the server at connect time.
    fn tools(&self) -> &[McpToolDescriptor];

    fn has_tool(&self, tool_name: &str) -> bool {
        self.tools().iter().any(|tool| tool.name == tool_name)
    }

    /// Invokes a remote tool, re-establishing the session when necessary.
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Value, McpError>;

    /// Releases the server-side session. Safe to call more than once.
    async fn disconnect(&self) -> Result<(), McpError>;
}

#[derive(Debug, Default)]
struct SessionState {
    ready: bool,
    session_id: Option<String>,
}

/// MCP client speaking JSON-RPC 2.0 over HTTP POST with SSE-framed
/// responses.
///
/// Connections are cheap to re-establish: `disconnect` drops the session
/// and the next `call_tool` initializes a fresh one, so a pool can be built
/// for discovery, torn down, and still dispatch later calls.
pub struct SseMcpClient {
    config: McpSseServerConfig,
    http: reqwest::Client,
    session: Mutex<SessionState>,
    tools: Vec<McpToolDescriptor>,
}

impl SseMcpClient {
    pub fn new(config: McpSseServerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session: Mutex::new(SessionState::default()),
            tools: Vec::new(),
        }
    }

    /// Initializes the protocol session and discovers the server's tools.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        let session_id = self.ensure_session().await?;
        let result = self
            .post_rpc(
                jsonrpc_request(MCP_TOOLS_LIST_REQUEST_ID, "tools/list", json!({})),
                session_id.as_deref(),
            )
            .await?;
        self.tools = decode_tool_descriptors(&self.config.url, &result)?;
        debug!(
            url = self.config.url.as_str(),
            tool_count = self.tools.len(),
            "discovered MCP tools"
        );
        Ok(())
    }

    async fn ensure_session(&self) -> Result<Option<String>, McpError> {
        let mut state = self.session.lock().await;
        if state.ready {
            return Ok(state.session_id.clone());
        }
        let (_, session_id) = self
            .post_rpc_with_session_header(
                jsonrpc_request(
                    MCP_INIT_REQUEST_ID,
                    "initialize",
                    json!({
                        "protocolVersion": MCP_PROTOCOL_VERSION,
                        "capabilities": { "tools": { "listChanged": true } },
                        "clientInfo": {
                            "name": "rho-rs",
                            "version": env!("CARGO_PKG_VERSION"),
                        },
                    }),
                ),
                None,
            )
            .await?;
        state.ready = true;
        state.session_id = session_id;
        Ok(state.session_id.clone())
    }

    async fn post_rpc(&self, payload: Value, session_id: Option<&str>) -> Result<Value, McpError> {
        let (result, _) = self.post_rpc_with_session_header(payload, session_id).await?;
        Ok(result)
    }

    /// Sends one JSON-RPC request and returns its result plus any session
    /// id the server handed back.
    async fn post_rpc_with_session_header(
        &self,
        payload: Value,
        session_id: Option<&str>,
    ) -> Result<(Value, Option<String>), McpError> {
        let mut request = self
            .http
            .post(&self.config.url)
            .timeout(Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS))
            .header(ACCEPT, "text/event-stream, application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }
        if let Some(session_id) = session_id {
            request = request.header(MCP_SESSION_HEADER, session_id);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|source| McpError::Transport {
                server: self.config.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Upstream {
                server: self.config.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let returned_session = response
            .headers()
            .get(MCP_SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response
            .text()
            .await
            .map_err(|source| McpError::Transport {
                server: self.config.url.clone(),
                source,
            })?;

        let envelope = if content_type.contains("text/event-stream") {
            parse_sse_data(&body).ok_or_else(|| McpError::InvalidPayload {
                server: self.config.url.clone(),
                detail: "no JSON data frame in SSE response".to_string(),
            })?
        } else {
            serde_json::from_str::<Value>(&body)?
        };

        let result = jsonrpc_result(&self.config.url, envelope)?;
        Ok((result, returned_session))
    }
}

#[async_trait]
impl McpClient for SseMcpClient {
    fn server_url(&self) -> &str {
        &self.config.url
    }

    fn tools(&self) -> &[McpToolDescriptor] {
        &self.tools
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Value, McpError> {
        let session_id = self.ensure_session().await?;
        debug!(
            url = self.config.url.as_str(),
            tool_name, "invoking MCP tool"
        );
        self.post_rpc(
            jsonrpc_request(
                MCP_TOOLS_CALL_REQUEST_ID,
                "tools/call",
                json!({ "name": tool_name, "arguments": arguments }),
            ),
            session_id.as_deref(),
        )
        .await
    }

    async fn disconnect(&self) -> Result<(), McpError> {
        let mut state = self.session.lock().await;
        if !state.ready {
            return Ok(());
        }
        let session_id = state.session_id.take();
        state.ready = false;
        let Some(session_id) = session_id else {
            return Ok(());
        };
        let response = self
            .http
            .delete(&self.config.url)
            .timeout(Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS))
            .header(MCP_SESSION_HEADER, &session_id)
            .send()
            .await
            .map_err(|source| McpError::Transport {
                server: self.config.url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Upstream {
                server: self.config.url.clone(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Connects to each configured server in order, keeping only the clients
/// that connect successfully.
///
/// Connect failures are logged and the half-open client is released
/// best-effort; a fully failed pool is an empty vector, never an error.
pub async fn create_mcp_clients(
    sse_servers: &[McpSseServerConfig],
) -> Vec<Arc<dyn McpClient>> {
    let mut clients: Vec<Arc<dyn McpClient>> = Vec::new();
    for server in sse_servers {
        info!(
            url = server.url.as_str(),
            "initializing MCP client with SSE connection"
        );
        let mut client = SseMcpClient::new(server.clone());
        match client.connect().await {
            Ok(()) => {
                info!(
                    url = server.url.as_str(),
                    tool_count = client.tools().len(),
                    "connected to MCP server via SSE"
                );
                clients.push(Arc::new(client));
            }
            Err(connect_error) => {
                error!(
                    url = server.url.as_str(),
                    error = %connect_error,
                    "failed to connect to MCP server"
                );
                if let Err(disconnect_error) = client.disconnect().await {
                    error!(
                        url = server.url.as_str(),
                        error = %disconnect_error,
                        "error during disconnect after failed connection"
                    );
                }
            }
        }
    }
    clients
}

fn jsonrpc_request(id: &str, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": MCP_JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

fn jsonrpc_result(server: &str, envelope: Value) -> Result<Value, McpError> {
    if let Some(error) = envelope.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown json-rpc error")
            .to_string();
        return Err(McpError::JsonRpc {
            server: server.to_string(),
            code,
            message,
        });
    }
    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| McpError::InvalidPayload {
            server: server.to_string(),
            detail: "response has no result object".to_string(),
        })
}

/// Extracts the last JSON payload from `data:` lines of an SSE body.
fn parse_sse_data(body: &str) -> Option<Value> {
    let mut last = None;
    for line in body.lines() {
        if let Some(stripped) = line.strip_prefix("data:") {
            let json_str = stripped.trim();
            if json_str.is_empty() {
                continue;
            }
            if let Ok(value) = serde_json::from_str::<Value>(json_str) {
                last = Some(value);
            }
        }
    }
    last
}

fn decode_tool_descriptors(server: &str, result: &Value) -> Result<Vec<McpToolDescriptor>, McpError> {
    let tools_array = result
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| McpError::InvalidPayload {
            server: server.to_string(),
            detail: "tools/list payload has no tools array".to_string(),
        })?;

    let mut descriptors = Vec::with_capacity(tools_array.len());
    for tool in tools_array {
        let object = tool.as_object().ok_or_else(|| McpError::InvalidPayload {
            server: server.to_string(),
            detail: "tool descriptor is not an object".to_string(),
        })?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| McpError::InvalidPayload {
                server: server.to_string(),
                detail: "tool descriptor missing name".to_string(),
            })?
            .to_string();
        let description = object
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let input_schema = object
            .get("inputSchema")
            .cloned()
            .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));
        descriptors.push(McpToolDescriptor {
            name,
            description,
            input_schema,
        });
    }
    Ok(descriptors)
}
