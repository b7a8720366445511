// ABOUTME: LLM provider abstraction for pluggable chat completion backends
// ABOUTME: Defines conversation messages, content blocks, and the LlmProvider trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # LLM Provider Service Provider Interface
//!
//! Contract that LLM providers implement to drive the chat loop. Messages
//! carry either plain text or ordered content blocks (text, tool
//! invocations, tool results) so a full tool-use round trip can be replayed
//! to the completion API verbatim.
//!
//! ## Key Concepts
//!
//! - **`Message`**: one conversation turn with role and content
//! - **`ContentBlock`**: typed block inside a structured turn
//! - **`ChatRequest`**: system prompt + tools + buffered conversation
//! - **`ModelResponse`**: ordered response blocks plus stop reason
//! - **`LlmProvider`**: async trait the orchestrator calls each round

pub mod anthropic;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use prompts::traffic_system_prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Stop reason emitted when the model requests tool invocations
pub const STOP_REASON_TOOL_USE: &str = "tool_use";

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input (also carries tool results back to the model)
    User,
    /// Assistant response
    Assistant,
}

/// A typed block inside a structured conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text segment
    Text {
        /// The text content
        text: String,
    },
    /// Tool invocation requested by the model
    ToolUse {
        /// Correlation id for the matching tool result
        id: String,
        /// Name of the tool to invoke
        name: String,
        /// Tool arguments as a JSON object
        input: Value,
    },
    /// Result of a tool invocation, fed back to the model
    ToolResult {
        /// Correlation id of the originating `tool_use` block
        tool_use_id: String,
        /// Normalized result text
        content: String,
    },
}

/// Content of a conversation turn: plain text or structured blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Ordered content blocks
    Blocks(Vec<ContentBlock>),
}

/// A single turn in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: MessageContent,
}

impl Message {
    /// Create a plain-text user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message from response blocks
    #[must_use]
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Create the user-role turn carrying tool results back to the model
    #[must_use]
    pub fn tool_results(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Whether every block in this turn is a tool result
    ///
    /// Used by the history trimmer: a window must never open with a
    /// tool-result turn whose requesting assistant turn was dropped.
    #[must_use]
    pub fn is_tool_result_turn(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Blocks(blocks) => {
                !blocks.is_empty()
                    && blocks
                        .iter()
                        .all(|b| matches!(b, ContentBlock::ToolResult { .. }))
            }
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Tool definition advertised to the model (completion-API shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema of the tool input
    pub input_schema: Value,
}

/// Configuration for a chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System prompt
    pub system: String,
    /// Conversation turns, oldest first
    pub messages: Vec<Message>,
    /// Tools the model may invoke
    pub tools: Vec<ToolDefinition>,
    /// Model identifier (provider-specific); provider default when `None`
    pub model: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Create a new chat request
    #[must_use]
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            tools: Vec::new(),
            model: None,
            max_tokens: crate::constants::limits::MAX_COMPLETION_TOKENS,
        }
    }

    /// Attach tool definitions
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub input_tokens: u32,
    /// Tokens in the completion
    pub output_tokens: u32,
}

/// Response from a chat completion
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// Ordered response blocks (text and tool invocations interleaved)
    pub content: Vec<ContentBlock>,
    /// Stop reason reported by the API
    pub stop_reason: Option<String>,
    /// Token usage statistics, when reported
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    /// Whether the model stopped to request tool invocations
    #[must_use]
    pub fn requests_tools(&self) -> bool {
        self.stop_reason.as_deref() == Some(STOP_REASON_TOOL_USE)
    }

    /// Concatenated text of all text blocks
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// LLM provider trait for chat completion
///
/// Implementations are injected into the chat service so tests can drive
/// the loop with scripted responses.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier (e.g., "anthropic")
    fn name(&self) -> &'static str;

    /// Default model used when the request does not specify one
    fn default_model(&self) -> &str;

    /// Perform a chat completion with tool support
    async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, AppError>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_wire_format() {
        let block = ContentBlock::ToolUse {
            id: "toolu_01".into(),
            name: "geocode_location".into(),
            input: json!({"location": "Downtown"}),
        };
        let wire = serde_json::to_value(&block).unwrap();
        assert_eq!(wire["type"], "tool_use");
        assert_eq!(wire["input"]["location"], "Downtown");
    }

    #[test]
    fn test_plain_text_message_serializes_as_string() {
        let message = Message::user("hola");
        let wire = serde_json::to_value(&message).unwrap();
        assert_eq!(wire["content"], "hola");
        assert_eq!(wire["role"], "user");
    }

    #[test]
    fn test_tool_result_turn_detection() {
        let results = Message::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_01".into(),
            content: "{}".into(),
        }]);
        assert!(results.is_tool_result_turn());
        assert!(!Message::user("hola").is_tool_result_turn());

        let mixed = Message::assistant_blocks(vec![ContentBlock::Text {
            text: "checking".into(),
        }]);
        assert!(!mixed.is_tool_result_turn());
    }

    #[test]
    fn test_response_text_concatenates_blocks() {
        let response = ModelResponse {
            content: vec![
                ContentBlock::Text { text: "El ".into() },
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "x".into(),
                    input: json!({}),
                },
                ContentBlock::Text {
                    text: "tráfico".into(),
                },
            ],
            stop_reason: Some(STOP_REASON_TOOL_USE.into()),
            usage: None,
        };
        assert_eq!(response.text(), "El tráfico");
        assert!(response.requests_tools());
    }
}
