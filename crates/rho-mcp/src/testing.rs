//! In-process fakes for exercising the dispatcher and schema adapter
//! without a network.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::client::{McpClient, McpError, McpToolDescriptor};

pub(crate) struct StaticMcpClient {
    url: String,
    tools: Vec<McpToolDescriptor>,
    response: Value,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StaticMcpClient {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tools: Vec::new(),
            response: json!({ "ok": true }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_tool(self, name: &str, description: &str) -> Self {
        self.with_tool_schema(
            name,
            description,
            json!({ "type": "object", "properties": {} }),
        )
    }

    pub(crate) fn with_tool_schema(mut self, name: &str, description: &str, schema: Value) -> Self {
        self.tools.push(McpToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: schema,
        });
        self
    }

    pub(crate) fn with_response(mut self, response: Value) -> Self {
        self.response = response;
        self
    }

    pub(crate) async fn recorded_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl McpClient for StaticMcpClient {
    fn server_url(&self) -> &str {
        &self.url
    }

    fn tools(&self) -> &[McpToolDescriptor] {
        &self.tools
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Value, McpError> {
        self.calls
            .lock()
            .await
            .push((tool_name.to_string(), arguments));
        Ok(self.response.clone())
    }

    async fn disconnect(&self) -> Result<(), McpError> {
        Ok(())
    }
}
