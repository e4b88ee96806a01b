use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates supported `McpConfigError` values.
pub enum McpConfigError {
    #[error("failed to read mcp config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse mcp config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("mcp server url must be non-empty")]
    EmptyServerUrl,
    #[error("duplicate mcp server url '{0}'")]
    DuplicateServerUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single SSE tool-server endpoint with an optional access credential.
pub struct McpSseServerConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl McpSseServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: Some(api_key.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `McpConfig` used across Rho components.
pub struct McpConfig {
    #[serde(default)]
    pub sse_servers: Vec<McpSseServerConfig>,
}

impl McpConfig {
    pub fn new(sse_servers: Vec<McpSseServerConfig>) -> Self {
        Self { sse_servers }
    }

    /// Rejects blank and duplicate server URLs before any connection attempt.
    pub fn validate(&self) -> Result<(), McpConfigError> {
        let mut seen_urls = BTreeSet::new();
        for server in &self.sse_servers {
            let url = server.url.trim();
            if url.is_empty() {
                return Err(McpConfigError::EmptyServerUrl);
            }
            if !seen_urls.insert(url.to_string()) {
                return Err(McpConfigError::DuplicateServerUrl(url.to_string()));
            }
        }
        Ok(())
    }
}

/// Loads and validates an MCP configuration from a JSON file.
pub fn load_mcp_config(path: &Path) -> Result<McpConfig, McpConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| McpConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config =
        serde_json::from_str::<McpConfig>(&raw).map_err(|source| McpConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
