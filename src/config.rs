// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses env vars into a typed ServerConfig consumed at process start
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! Environment-based configuration management

use crate::constants::env_config;
use anyhow::{Context, Result};
use url::Url;

/// Firestore mirroring credentials
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Google Cloud project id hosting the Firestore database
    pub project_id: String,
    /// Web API key passed as the `key` query parameter
    pub api_key: String,
}

/// Server configuration loaded from the environment
///
/// Absence of the Anthropic key or Firestore credentials does not prevent
/// startup: it only gates the `/health` flags, makes chat-session creation
/// fail, and silently disables transcript mirroring respectively.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// MCP tool server endpoint
    pub mcp_server_url: Url,
    /// Anthropic API key, if configured
    pub anthropic_api_key: Option<String>,
    /// Firestore mirroring configuration, if fully configured
    pub firestore: Option<FirestoreConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `MCP_SERVER_URL` is present but not a valid URL.
    pub fn from_env() -> Result<Self> {
        let raw_mcp_url = env_config::mcp_server_url();
        let mcp_server_url = Url::parse(&raw_mcp_url)
            .with_context(|| format!("MCP_SERVER_URL is not a valid URL: {raw_mcp_url}"))?;

        let firestore = match (
            env_config::firebase_project_id(),
            env_config::firebase_api_key(),
        ) {
            (Some(project_id), Some(api_key)) => Some(FirestoreConfig {
                project_id,
                api_key,
            }),
            _ => None,
        };

        Ok(Self {
            http_port: env_config::http_port(),
            mcp_server_url,
            anthropic_api_key: env_config::anthropic_api_key(),
            firestore,
        })
    }

    /// Whether the MCP endpoint was explicitly configured or defaulted
    #[must_use]
    pub fn mcp_configured(&self) -> bool {
        std::env::var("MCP_SERVER_URL").is_ok()
    }

    /// Whether an Anthropic API key is available
    #[must_use]
    pub const fn anthropic_configured(&self) -> bool {
        self.anthropic_api_key.is_some()
    }

    /// One-line startup summary with secrets elided
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "http_port={} mcp_server_url={} anthropic_configured={} firestore_configured={}",
            self.http_port,
            self.mcp_server_url,
            self.anthropic_configured(),
            self.firestore.is_some(),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_summary_elides_secrets() {
        let config = ServerConfig {
            http_port: 8081,
            mcp_server_url: Url::parse("http://localhost:8080/mcp").unwrap(),
            anthropic_api_key: Some("sk-ant-secret".into()),
            firestore: None,
        };
        let summary = config.summary();
        assert!(!summary.contains("sk-ant-secret"));
        assert!(summary.contains("anthropic_configured=true"));
    }
}
