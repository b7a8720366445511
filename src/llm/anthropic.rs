// ABOUTME: Anthropic Claude LLM provider implementation over the Messages API
// ABOUTME: Handles tool-use responses so the chat loop can dispatch MCP tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Anthropic Provider
//!
//! Implementation of the `LlmProvider` trait for Anthropic's Messages API.
//!
//! ## Configuration
//!
//! Set the `ANTHROPIC_API_KEY` environment variable. Authentication uses the
//! `x-api-key` header plus `anthropic-version: 2023-06-01`.
//!
//! ## Tool Use
//!
//! Tools are passed as `{name, description, input_schema}` objects; when the
//! model decides to call one, the response carries `stop_reason: "tool_use"`
//! and `tool_use` content blocks that the chat loop answers with
//! `tool_result` blocks on the next request.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    ChatRequest, ContentBlock, LlmProvider, Message, ModelResponse, TokenUsage, ToolDefinition,
};
use crate::constants::timeouts;
use crate::errors::AppError;

/// Environment variable for the Anthropic API key
const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default model to use
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Messages API endpoint
const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Required API version header value
const API_VERSION: &str = "2023-06-01";

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Messages API request body
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    messages: &'a [Message],
}

/// Messages API response body
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<TokenUsage>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Anthropic Claude LLM provider
pub struct AnthropicProvider {
    api_key: String,
    client: Client,
    default_model: String,
}

impl AnthropicProvider {
    /// Create a new provider with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::builder()
                .timeout(timeouts::REASONING_API)
                .build()
                .unwrap_or_default(),
            default_model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Create a provider from the `ANTHROPIC_API_KEY` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = env::var(ANTHROPIC_API_KEY_ENV).map_err(|_| {
            AppError::config(format!(
                "{ANTHROPIC_API_KEY_ENV} not found in environment variables"
            ))
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            system: &request.system,
            tools: &request.tools,
            messages: &request.messages,
        };

        debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::reasoning_api(format!("Failed to call Claude API: {e}")).with_source(e)
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            AppError::reasoning_api(format!("Failed to read Claude API response: {e}"))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<AnthropicErrorEnvelope>(&response_text)
                .map_or_else(
                    |_| response_text.clone(),
                    |env| format!("{}: {}", env.error.kind, env.error.message),
                );
            return Err(AppError::reasoning_api(format!(
                "Claude API returned {status}: {detail}"
            )));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&response_text).map_err(|e| {
            AppError::reasoning_api(format!("Unexpected Claude API response shape: {e}"))
        })?;

        Ok(ModelResponse {
            content: parsed.content,
            stop_reason: parsed.stop_reason,
            usage: parsed.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::llm::MessageContent;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest::new("system prompt", vec![Message::user("hola")]).with_tools(
            vec![ToolDefinition {
                name: "geocode_location".into(),
                description: "Geocode a place name".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            }],
        );
        let body = AnthropicRequest {
            model: DEFAULT_MODEL,
            max_tokens: request.max_tokens,
            system: &request.system,
            tools: &request.tools,
            messages: &request.messages,
        };
        let wire = serde_json::to_value(&body).unwrap();
        assert_eq!(wire["model"], DEFAULT_MODEL);
        assert_eq!(wire["max_tokens"], 4096);
        assert_eq!(wire["tools"][0]["name"], "geocode_location");
        assert_eq!(wire["messages"][0]["content"], "hola");
    }

    #[test]
    fn test_tools_field_omitted_when_empty() {
        let request = ChatRequest::new("s", vec![Message::user("m")]);
        let body = AnthropicRequest {
            model: DEFAULT_MODEL,
            max_tokens: request.max_tokens,
            system: &request.system,
            tools: &request.tools,
            messages: &request.messages,
        };
        let wire = serde_json::to_value(&body).unwrap();
        assert!(wire.get("tools").is_none());
    }

    #[test]
    fn test_response_parsing_with_tool_use() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Voy a buscar la ubicación."},
                {"type": "tool_use", "id": "toolu_01", "name": "geocode_location",
                 "input": {"location": "Downtown"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 45}
        }))
        .unwrap();
        assert_eq!(parsed.content.len(), 2);
        assert_eq!(parsed.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(parsed.usage.unwrap().output_tokens, 45);
    }

    #[test]
    fn test_structured_turn_round_trips_to_wire() {
        let turn = Message::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_01".into(),
            content: r#"{"status":"success"}"#.into(),
        }]);
        let wire = serde_json::to_value(&turn).unwrap();
        assert_eq!(wire["content"][0]["type"], "tool_result");

        let back: Message = serde_json::from_value(wire).unwrap();
        assert!(matches!(back.content, MessageContent::Blocks(_)));
    }
}
