// ABOUTME: The conversational tool-orchestration loop driving LLM completions and MCP tools
// ABOUTME: Owns the conversation buffer and turn-scoped map builder, emits progress events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Traffic Chat Service
//!
//! One instance per session. A chat turn runs the request/act/observe loop:
//! send the buffered conversation to the LLM; when the model requests tool
//! invocations, execute them sequentially in emission order (the map folding
//! rules depend on that order), feed the results back, and repeat until the
//! model answers in plain text or the iteration cap is reached.
//!
//! Failure semantics: an LLM transport failure is fatal to the turn; a tool
//! failure becomes visible tool-result text so the model can self-correct;
//! durable-store writes are best-effort and never fail the turn.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::history::ConversationBuffer;
use super::map_data::MapDataBuilder;
use super::progress::{tool_progress_message, tool_progress_record};
use crate::constants::limits::{MAX_HISTORY_MESSAGES, MAX_TOOL_ITERATIONS, MAX_TOOL_RESULT_CHARS};
use crate::errors::AppResult;
use crate::llm::{
    traffic_system_prompt, ChatRequest, ContentBlock, LlmProvider, Message, ModelResponse,
    ToolDefinition,
};
use crate::mcp::{ToolGateway, ToolSchema};
use crate::models::{ChatResult, ToolProgress};
use crate::store::SessionStore;

/// Channel end a caller may supply to observe tool progress live
pub type ProgressSink = mpsc::UnboundedSender<ToolProgress>;

/// State accumulated while processing one user turn
struct TurnState {
    builder: MapDataBuilder,
    progress: Vec<ToolProgress>,
    draft_message_id: Option<String>,
}

/// Per-session chat service
pub struct TrafficChatService {
    session_id: String,
    provider: Arc<dyn LlmProvider>,
    gateway: Arc<dyn ToolGateway>,
    store: Arc<dyn SessionStore>,
    tools: Vec<ToolDefinition>,
    history: ConversationBuffer,
}

impl TrafficChatService {
    /// Build a service, fetching the tool schemas once
    ///
    /// # Errors
    ///
    /// Propagates the gateway's `GatewayUnavailable` error when the tool
    /// service cannot be reached; the caller must not register the session
    /// in that case.
    pub async fn initialize(
        session_id: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        gateway: Arc<dyn ToolGateway>,
        store: Arc<dyn SessionStore>,
    ) -> AppResult<Self> {
        let schemas = gateway.list_tools().await?;
        let tools = schemas.iter().map(ToolSchema::to_tool_definition).collect();
        info!("chat service initialized with {} MCP tools", schemas.len());

        Ok(Self {
            session_id: session_id.into(),
            provider,
            gateway,
            store,
            tools,
            history: ConversationBuffer::new(MAX_HISTORY_MESSAGES),
        })
    }

    /// Clear the conversation history (explicit session reset)
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Number of turns currently buffered
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Process one user message and return the final answer
    ///
    /// # Errors
    ///
    /// Returns a `ReasoningApi` error when an LLM call fails. Tool failures
    /// do not error — they are fed back to the model as result text.
    pub async fn chat(
        &mut self,
        user_message: &str,
        progress_sink: Option<&ProgressSink>,
    ) -> AppResult<ChatResult> {
        debug!(
            "processing message: {}",
            user_message.chars().take(100).collect::<String>()
        );

        let mut turn = TurnState {
            builder: MapDataBuilder::new(),
            progress: Vec::new(),
            draft_message_id: None,
        };

        self.history.append(Message::user(user_message));

        // Mirror the user message and open an assistant draft the progress
        // updates patch in place.
        self.store_append(json!({
            "role": "user",
            "content": user_message,
            "source": "api",
        }))
        .await;
        turn.draft_message_id = self
            .store_append(json!({
                "role": "assistant",
                "content": "",
                "status": "running",
                "mapData": null,
                "toolProgress": [],
                "source": "api_draft",
            }))
            .await;

        self.history.trim();

        let mut response = self.complete().await?;

        let mut iterations = 0;
        while response.requests_tools() && iterations < MAX_TOOL_ITERATIONS {
            iterations += 1;
            debug!("tool use iteration {iterations}");

            self.history
                .append(Message::assistant_blocks(response.content.clone()));

            let tool_results = self
                .execute_tool_blocks(&response, &mut turn, progress_sink)
                .await;
            self.history.append(Message::tool_results(tool_results));
            self.history.trim();

            response = self.complete().await?;
        }

        if response.requests_tools() {
            warn!(
                "tool loop exceeded {MAX_TOOL_ITERATIONS} iterations, returning partial text"
            );
        }

        let final_response = response.text();
        self.history
            .append(Message::assistant_blocks(response.content));

        self.finalize_draft(&turn, &final_response).await;

        info!(
            iterations,
            progress_messages = turn.progress.len(),
            "chat turn completed"
        );

        Ok(ChatResult {
            response: final_response,
            map_data: turn.builder.into_map_data(),
            tool_progress: turn.progress,
        })
    }

    /// Execute every tool invocation of one model turn, in emission order
    async fn execute_tool_blocks(
        &self,
        response: &ModelResponse,
        turn: &mut TurnState,
        progress_sink: Option<&ProgressSink>,
    ) -> Vec<ContentBlock> {
        let mut tool_results = Vec::new();
        let mut previous_explanation: Option<String> = None;

        for block in &response.content {
            match block {
                ContentBlock::Text { text } => {
                    previous_explanation = Some(text.clone());
                }
                ContentBlock::ToolUse { id, name, input } => {
                    let message =
                        tool_progress_message(name, input, previous_explanation.as_deref());
                    previous_explanation = None;
                    debug!("progress: {message}");

                    let record = tool_progress_record(name, message);
                    turn.progress.push(record.clone());
                    if let Some(sink) = progress_sink {
                        // A dropped receiver only means nobody is watching.
                        let _ = sink.send(record);
                    }
                    self.update_draft_progress(turn).await;

                    info!(tool = %name, "executing tool");
                    let content = self.run_tool(name, input, turn).await;
                    tool_results.push(ContentBlock::ToolResult {
                        tool_use_id: id.clone(),
                        content,
                    });
                }
                ContentBlock::ToolResult { .. } => {}
            }
        }

        tool_results
    }

    /// Invoke one tool, fold its result, and produce the result text
    async fn run_tool(&self, name: &str, input: &Value, turn: &mut TurnState) -> String {
        match self.gateway.invoke(name, input).await {
            Ok(text) => match turn.builder.fold(name, &text) {
                Ok(()) => {
                    debug!(tool = %name, chars = text.len(), "tool executed successfully");
                    truncate_tool_result(&text)
                }
                Err(e) => {
                    warn!(tool = %name, "tool result could not be folded: {e}");
                    format!("Error ejecutando herramienta: {}", e.message)
                }
            },
            Err(e) => {
                error!(tool = %name, "tool execution error: {e}");
                format!("Error ejecutando herramienta: {}", e.message)
            }
        }
    }

    async fn complete(&self) -> AppResult<ModelResponse> {
        let request = ChatRequest::new(traffic_system_prompt(), self.history.snapshot())
            .with_tools(self.tools.clone());
        self.provider.complete(&request).await
    }

    // ------------------------------------------------------------------
    // Best-effort transcript mirroring
    // ------------------------------------------------------------------

    async fn store_append(&self, doc: Value) -> Option<String> {
        match self.store.append_message(&self.session_id, &doc).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("could not persist session message: {e}");
                None
            }
        }
    }

    async fn store_update(&self, message_id: &str, patch: Value) {
        if let Err(e) = self
            .store
            .update_message(&self.session_id, message_id, &patch)
            .await
        {
            warn!("could not update session message: {e}");
        }
    }

    async fn update_draft_progress(&self, turn: &TurnState) {
        let Some(draft_id) = &turn.draft_message_id else {
            return;
        };
        let patch = json!({
            "content": "",
            "toolProgress": turn.progress,
            "mapData": turn.builder.map_data(),
            "status": "running",
        });
        self.store_update(draft_id, patch).await;
    }

    async fn finalize_draft(&self, turn: &TurnState, final_response: &str) {
        if let Some(draft_id) = &turn.draft_message_id {
            let patch = json!({
                "content": final_response,
                "mapData": turn.builder.map_data(),
                "toolProgress": turn.progress,
                "status": "done",
            });
            self.store_update(draft_id, patch).await;
        } else {
            self.store_append(json!({
                "role": "assistant",
                "content": final_response,
                "mapData": turn.builder.map_data(),
                "toolProgress": turn.progress,
            }))
            .await;
        }
    }
}

/// Cap a tool result at the character budget, appending a truncation notice
///
/// When the truncated prefix closes into a JSON object by appending `}`, the
/// notice is injected as two extra fields so the model still sees valid
/// JSON; otherwise a plain text marker is appended.
#[must_use]
pub fn truncate_tool_result(content: &str) -> String {
    let char_count = content.chars().count();
    if char_count <= MAX_TOOL_RESULT_CHARS {
        return content.to_owned();
    }

    let byte_end = content
        .char_indices()
        .nth(MAX_TOOL_RESULT_CHARS)
        .map_or(content.len(), |(index, _)| index);
    let truncated = &content[..byte_end];
    let remaining_chars = char_count - MAX_TOOL_RESULT_CHARS;

    debug!(
        from = char_count,
        to = MAX_TOOL_RESULT_CHARS,
        removed = remaining_chars,
        "truncated tool result"
    );

    let closed = format!("{truncated}}}");
    if let Ok(Value::Object(mut parsed)) = serde_json::from_str::<Value>(&closed) {
        parsed.insert("_truncated".into(), json!(true));
        parsed.insert(
            "_truncated_message".into(),
            json!(format!(
                "Resultado truncado. Se omitieron {remaining_chars} caracteres. \
                 Usa filtros más específicos o límites menores."
            )),
        );
        serde_json::to_string_pretty(&Value::Object(parsed))
            .unwrap_or_else(|_| truncated.to_owned())
    } else {
        format!(
            "{truncated}\n\n[TRUNCADO: Se omitieron {remaining_chars} caracteres adicionales. \
             Usa filtros más específicos.]"
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_short_result_passes_through() {
        let content = r#"{"status":"success"}"#;
        assert_eq!(truncate_tool_result(content), content);
    }

    #[test]
    fn test_plain_text_truncation_appends_marker() {
        let content = "x".repeat(MAX_TOOL_RESULT_CHARS + 500);
        let truncated = truncate_tool_result(&content);
        assert!(truncated.contains("[TRUNCADO: Se omitieron 500 caracteres"));
        assert!(truncated.len() <= MAX_TOOL_RESULT_CHARS + 120);
    }

    #[test]
    fn test_json_truncation_injects_notice_fields() {
        // Sized so the cut lands right after the closing quote of "data",
        // letting the appended brace close the object into valid JSON:
        // `{"data":"` is 9 chars, the filler brings the quote to the budget.
        let filler = "a".repeat(MAX_TOOL_RESULT_CHARS - 10);
        let content = format!(r#"{{"data":"{filler}","next":"{}"}}"#, "b".repeat(400));
        let truncated = truncate_tool_result(&content);

        let Ok(Value::Object(parsed)) = serde_json::from_str::<Value>(&truncated) else {
            panic!("truncated result should have closed into a JSON object");
        };
        assert_eq!(parsed.get("_truncated"), Some(&json!(true)));
        assert!(parsed
            .get("_truncated_message")
            .and_then(Value::as_str)
            .is_some_and(|m| m.contains("Resultado truncado")));
        assert!(!parsed.contains_key("next"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let content = "ñ".repeat(MAX_TOOL_RESULT_CHARS + 10);
        let truncated = truncate_tool_result(&content);
        assert!(truncated.contains("[TRUNCADO: Se omitieron 10 caracteres"));
    }
}
