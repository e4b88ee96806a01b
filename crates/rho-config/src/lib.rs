//! MCP configuration types shared by the Rho client pool and runtime crates.

pub mod mcp_config;

pub use mcp_config::{load_mcp_config, McpConfig, McpConfigError, McpSseServerConfig};
