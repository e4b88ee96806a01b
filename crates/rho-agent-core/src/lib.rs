//! Core agent surface for Rho: chat-completion tool schema types and the
//! sink that attaches externally discovered MCP tools to an agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

const CHAT_TOOL_TYPE_FUNCTION: &str = "function";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Function payload of a chat-completion tool parameter.
pub struct ChatToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Public struct `ChatToolParam` used across Rho components.
///
/// Serializes to the `{"type":"function","function":{...}}` shape consumed
/// by chat-completion tool-calling interfaces.
pub struct ChatToolParam {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ChatToolFunction,
}

impl ChatToolParam {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: CHAT_TOOL_TYPE_FUNCTION.to_string(),
            function: ChatToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone)]
/// Public struct `AgentConfig` used across Rho components.
pub struct AgentConfig {
    pub agent_id: String,
    pub model: String,
    pub system_prompt: String,
    pub max_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: "rho-agent".to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful coding assistant.".to_string(),
            max_turns: 8,
        }
    }
}

/// Tool-using agent shell.
///
/// This crate only models the surface the MCP integration needs: the agent
/// accepts an adapted tool schema once per wiring pass and exposes it to the
/// surrounding turn loop.
#[derive(Debug, Default)]
pub struct Agent {
    config: AgentConfig,
    mcp_tools: Vec<ChatToolParam>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            mcp_tools: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Attaches MCP tools to the agent, skipping duplicate function names.
    ///
    /// The first occurrence of a name wins; later duplicates are dropped
    /// with a warning.
    pub fn set_mcp_tools(&mut self, tools: Vec<ChatToolParam>) {
        info!(
            agent_id = %self.config.agent_id,
            count = tools.len(),
            "setting MCP tools on agent"
        );
        for tool in tools {
            if self.has_mcp_tool(tool.function_name()) {
                warn!(
                    agent_id = %self.config.agent_id,
                    tool_name = tool.function_name(),
                    "MCP tool already registered, skipping duplicate"
                );
                continue;
            }
            self.mcp_tools.push(tool);
        }
        info!(
            agent_id = %self.config.agent_id,
            total = self.mcp_tools.len(),
            tool_names = ?self
                .mcp_tools
                .iter()
                .map(ChatToolParam::function_name)
                .collect::<Vec<_>>(),
            "MCP tool set updated"
        );
    }

    pub fn mcp_tools(&self) -> &[ChatToolParam] {
        &self.mcp_tools
    }

    pub fn has_mcp_tool(&self, tool_name: &str) -> bool {
        self.mcp_tools
            .iter()
            .any(|tool| tool.function_name() == tool_name)
    }
}
