// ABOUTME: Tool gateway abstraction over the external MCP tool service
// ABOUTME: Defines tool schemas, result normalization, and the ToolGateway trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Tool Gateway
//!
//! The chat loop never talks to the MCP server directly — it goes through
//! the `ToolGateway` trait so tests can inject scripted tool results. The
//! real implementation (`TrafficMcpClient`) opens one short-lived streamable
//! HTTP connection per operation.

pub mod client;

pub use client::TrafficMcpClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::llm::ToolDefinition;

/// Names of the tools the traffic MCP server exposes
pub mod tool_names {
    /// Convert a place name into coordinates
    pub const GEOCODE_LOCATION: &str = "geocode_location";
    /// Nearby monitoring stations with live traffic for a coordinate
    pub const GET_TRAFFIC_AT_LOCATION: &str = "get_traffic_at_location";
    /// List monitoring stations, optionally filtered by freeway
    pub const GET_TRAFFIC_STATIONS: &str = "get_traffic_stations";
    /// Current traffic measurements
    pub const GET_ACTUAL_TRAFFIC: &str = "get_actual_traffic";
    /// Predict a station's future speed performance index
    pub const PREDICT_TRAFFIC_SPI: &str = "predict_traffic_spi";
    /// Suggest routes between two stations
    pub const SUGGEST_ROUTES: &str = "suggest_routes";
}

/// Tools the traffic MCP server is expected to expose
///
/// A missing tool is logged as a warning at schema-listing time, not an
/// error: the model simply works with what the server advertises.
pub const EXPECTED_TOOLS: &[&str] = &[
    tool_names::GET_TRAFFIC_STATIONS,
    tool_names::GET_ACTUAL_TRAFFIC,
    tool_names::PREDICT_TRAFFIC_SPI,
    tool_names::SUGGEST_ROUTES,
    tool_names::GEOCODE_LOCATION,
    tool_names::GET_TRAFFIC_AT_LOCATION,
];

/// Tool schema advertised by the MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the tool input
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSchema {
    /// Convert to the completion-API tool shape
    #[must_use]
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// One content item of an MCP tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContentItem {
    /// Content type ("text", "image", ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Text payload for text items
    #[serde(default)]
    pub text: String,
}

/// Raw MCP tool invocation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Ordered content items
    #[serde(default)]
    pub content: Vec<ToolContentItem>,
    /// Whether the tool itself reported an error
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Normalize the result to the text the model sees
    ///
    /// Text items are joined with newlines; a result without text items
    /// falls back to its JSON serialization so nothing is silently lost.
    #[must_use]
    pub fn to_text(&self) -> String {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter(|item| item.kind == "text")
            .map(|item| item.text.as_str())
            .collect();
        if texts.is_empty() {
            serde_json::to_string(self).unwrap_or_default()
        } else {
            texts.join("\n")
        }
    }
}

/// Gateway to the external tool service
///
/// Implementations are stateless aside from a schema cache; each invocation
/// is an independent request/response exchange.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// List available tools with their schemas
    ///
    /// Fails with a `GatewayUnavailable` error when the service cannot be
    /// reached. Called once per chat-service initialization; the result is
    /// cached by the caller.
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, AppError>;

    /// Invoke a named tool and return its normalized text result
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_schema_parses_mcp_wire_shape() {
        let schema: ToolSchema = serde_json::from_value(json!({
            "name": "geocode_location",
            "description": "Convert a place name into coordinates",
            "inputSchema": {
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }
        }))
        .unwrap();
        assert_eq!(schema.name, "geocode_location");

        let definition = schema.to_tool_definition();
        assert_eq!(definition.input_schema["required"][0], "location");
    }

    #[test]
    fn test_result_text_joins_text_items() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "line two"}
            ]
        }))
        .unwrap();
        assert_eq!(result.to_text(), "line one\nline two");
    }

    #[test]
    fn test_result_without_text_falls_back_to_json() {
        let result = ToolCallResult {
            content: Vec::new(),
            is_error: false,
        };
        assert!(result.to_text().contains("content"));
    }
}
