// ABOUTME: Shared test fakes for the LLM provider, tool gateway, and session store
// ABOUTME: Scripted collaborators so orchestration tests run without live services
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use traffic_assistant::errors::{AppError, AppResult};
use traffic_assistant::llm::{ChatRequest, ContentBlock, LlmProvider, ModelResponse};
use traffic_assistant::mcp::{ToolGateway, ToolSchema};
use traffic_assistant::store::SessionStore;

// ============================================================================
// Scripted LLM provider
// ============================================================================

enum Script {
    Queue(VecDeque<ModelResponse>),
    Repeat(ModelResponse),
}

/// LLM provider returning pre-scripted responses and recording every request
pub struct ScriptedLlm {
    script: Mutex<Script>,
    /// Every request the chat loop sent, in order
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::Queue(responses.into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A provider that answers every request with the same response
    pub fn repeating(response: ModelResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::Repeat(response)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, AppError> {
        self.requests.lock().await.push(request.clone());
        match &mut *self.script.lock().await {
            Script::Queue(queue) => queue.pop_front().ok_or_else(|| {
                AppError::reasoning_api("scripted provider ran out of responses")
            }),
            Script::Repeat(response) => Ok(response.clone()),
        }
    }
}

/// A provider whose completion call always fails
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn default_model(&self) -> &str {
        "failing-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ModelResponse, AppError> {
        Err(AppError::reasoning_api("Failed to call Claude API: connection refused"))
    }
}

// ============================================================================
// Scripted tool gateway
// ============================================================================

/// Tool gateway returning scripted results in invocation order
pub struct ScriptedGateway {
    tools: Vec<ToolSchema>,
    results: Mutex<VecDeque<AppResult<String>>>,
    default_result: Option<String>,
    fail_listing: bool,
    /// Every `(tool_name, arguments)` invocation, in order
    pub invocations: Mutex<Vec<(String, Value)>>,
}

impl ScriptedGateway {
    pub fn new(results: Vec<AppResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            tools: default_tool_schemas(),
            results: Mutex::new(results.into()),
            default_result: None,
            fail_listing: false,
            invocations: Mutex::new(Vec::new()),
        })
    }

    /// A gateway that answers every invocation with the same result
    pub fn repeating(result: &str) -> Arc<Self> {
        Arc::new(Self {
            tools: default_tool_schemas(),
            results: Mutex::new(VecDeque::new()),
            default_result: Some(result.to_owned()),
            fail_listing: false,
            invocations: Mutex::new(Vec::new()),
        })
    }

    /// A gateway whose schema listing fails (unreachable tool service)
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            tools: Vec::new(),
            results: Mutex::new(VecDeque::new()),
            default_result: None,
            fail_listing: true,
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub async fn invocation_count(&self) -> usize {
        self.invocations.lock().await.len()
    }
}

#[async_trait]
impl ToolGateway for ScriptedGateway {
    async fn list_tools(&self) -> AppResult<Vec<ToolSchema>> {
        if self.fail_listing {
            return Err(AppError::gateway_unavailable(
                "Failed to get MCP tools: connection refused",
            ));
        }
        Ok(self.tools.clone())
    }

    async fn invoke(&self, name: &str, arguments: &Value) -> AppResult<String> {
        self.invocations
            .lock()
            .await
            .push((name.to_owned(), arguments.clone()));
        if let Some(result) = self.results.lock().await.pop_front() {
            return result;
        }
        self.default_result.clone().ok_or_else(|| {
            AppError::tool_execution(format!("Failed to call tool {name}: no scripted result"))
        })
    }
}

fn default_tool_schemas() -> Vec<ToolSchema> {
    ["geocode_location", "get_traffic_at_location", "suggest_routes"]
        .into_iter()
        .map(|name| ToolSchema {
            name: name.to_owned(),
            description: format!("{name} tool"),
            input_schema: json!({"type": "object", "properties": {}}),
        })
        .collect()
}

// ============================================================================
// Recording session store
// ============================================================================

/// One recorded store operation
#[derive(Debug, Clone)]
pub enum StoreOp {
    Append { session_id: String, id: String, doc: Value },
    Update { session_id: String, id: String, patch: Value },
}

/// Session store that records every write
#[derive(Default)]
pub struct RecordingStore {
    pub ops: Mutex<Vec<StoreOp>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn append_message(&self, session_id: &str, doc: &Value) -> AppResult<String> {
        let mut ops = self.ops.lock().await;
        let id = format!("msg-{}", ops.len());
        ops.push(StoreOp::Append {
            session_id: session_id.to_owned(),
            id: id.clone(),
            doc: doc.clone(),
        });
        Ok(id)
    }

    async fn update_message(
        &self,
        session_id: &str,
        message_id: &str,
        patch: &Value,
    ) -> AppResult<()> {
        self.ops.lock().await.push(StoreOp::Update {
            session_id: session_id.to_owned(),
            id: message_id.to_owned(),
            patch: patch.clone(),
        });
        Ok(())
    }
}

/// Session store whose every write fails
pub struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn append_message(&self, _session_id: &str, _doc: &Value) -> AppResult<String> {
        Err(AppError::persistence("Firestore write error: offline"))
    }

    async fn update_message(
        &self,
        _session_id: &str,
        _message_id: &str,
        _patch: &Value,
    ) -> AppResult<()> {
        Err(AppError::persistence("Firestore update error: offline"))
    }
}

// ============================================================================
// Response and fixture builders
// ============================================================================

/// A plain-text model response ending the turn
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::Text { text: text.into() }],
        stop_reason: Some("end_turn".into()),
        usage: None,
    }
}

/// A tool-use model response, optionally preceded by explanatory text
pub fn tool_use_response(explanation: Option<&str>, calls: &[(&str, &str, Value)]) -> ModelResponse {
    let mut content = Vec::new();
    if let Some(text) = explanation {
        content.push(ContentBlock::Text { text: text.into() });
    }
    for (id, name, input) in calls {
        content.push(ContentBlock::ToolUse {
            id: (*id).to_owned(),
            name: (*name).to_owned(),
            input: input.clone(),
        });
    }
    ModelResponse {
        content,
        stop_reason: Some("tool_use".into()),
        usage: None,
    }
}

/// Successful geocode tool result
pub fn geocode_success(location: &str, lat: f64, lon: f64) -> String {
    json!({
        "status": "success",
        "location": location,
        "coordinates": {"latitude": lat, "longitude": lon}
    })
    .to_string()
}

/// Successful traffic lookup with generated stations
pub fn traffic_success(name: &str, lat: f64, lon: f64, station_ids: &[i64]) -> String {
    let stations: Vec<Value> = station_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "name": format!("Station {id}"),
                "latitude": lat + 0.01 * (i as f64),
                "longitude": lon + 0.01 * (i as f64),
                "freeway": 405,
                "direction": "N",
                "lanes": 4,
                "type": "ML",
                "distance_km": 0.5 + i as f64,
                "traffic": {
                    "spi": 60.0 + i as f64,
                    "congestion_level": 1,
                    "congestion_label": "Fluido",
                    "traffic_state": "normal",
                    "confidence_level": "high"
                }
            })
        })
        .collect();
    json!({
        "status": "success",
        "query_location": {"name": name, "latitude": lat, "longitude": lon},
        "stations": stations,
        "stations_count": station_ids.len(),
        "map_center": {"latitude": lat, "longitude": lon},
        "map_zoom": 14.0
    })
    .to_string()
}

/// Route suggestion with inline station details
pub fn routes_success(details: &[(i64, f64, f64)]) -> String {
    let station_details: Vec<Value> = details
        .iter()
        .map(|(id, lat, lon)| {
            json!({
                "id": id,
                "latitude": lat,
                "longitude": lon,
                "name": format!("Station {id}"),
                "freeway": 10,
                "direction": "W"
            })
        })
        .collect();
    let ids: Vec<i64> = details.iter().map(|(id, _, _)| *id).collect();
    json!({
        "routes": [{
            "stations": ids,
            "station_details": station_details,
            "total_distance_km": 25.3
        }]
    })
    .to_string()
}
