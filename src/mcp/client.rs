// ABOUTME: MCP streamable HTTP client with one short-lived connection per operation
// ABOUTME: Handles initialize/initialized handshake, JSON or SSE-framed responses, teardown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Traffic MCP Client
//!
//! Client for the external traffic tool server speaking MCP over streamable
//! HTTP. Every `list_tools`/`invoke` opens a fresh connection (initialize
//! handshake, operation, HTTP DELETE teardown) and the teardown runs on the
//! error paths too, mirroring a try/finally. The only state kept between
//! calls is the tool schema cache.

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::{ToolCallResult, ToolGateway, ToolSchema, EXPECTED_TOOLS};
use crate::constants::{service, timeouts};
use crate::errors::{AppError, AppResult};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

use async_trait::async_trait;

/// MCP protocol revision spoken by this client
const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Session header used by streamable HTTP transports
const SESSION_HEADER: &str = "mcp-session-id";

/// MCP client for the traffic tool server
pub struct TrafficMcpClient {
    endpoint: Url,
    client: Client,
    tools_cache: RwLock<Option<Vec<ToolSchema>>>,
}

impl TrafficMcpClient {
    /// Create a client for the given MCP endpoint
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        info!("MCP client initialized for server: {endpoint}");
        Self {
            endpoint,
            client: Client::builder()
                .timeout(timeouts::TOOL_INVOKE)
                .build()
                .unwrap_or_default(),
            tools_cache: RwLock::new(None),
        }
    }

    /// Tools from the last successful listing, if any
    pub async fn cached_tools(&self) -> Option<Vec<ToolSchema>> {
        self.tools_cache.read().await.clone()
    }

    async fn open_connection(&self) -> AppResult<McpConnection> {
        McpConnection::open(self.client.clone(), self.endpoint.clone()).await
    }
}

#[async_trait]
impl ToolGateway for TrafficMcpClient {
    async fn list_tools(&self) -> AppResult<Vec<ToolSchema>> {
        debug!("fetching available tools");

        let mut conn = self
            .open_connection()
            .await
            .map_err(|e| AppError::gateway_unavailable(format!("Failed to get MCP tools: {e}")))?;
        let result = conn.request("tools/list", None).await;
        conn.close().await;

        let value = result
            .map_err(|e| AppError::gateway_unavailable(format!("Failed to get MCP tools: {e}")))?;
        let tools: Vec<ToolSchema> = serde_json::from_value(
            value.get("tools").cloned().unwrap_or(Value::Null),
        )
        .map_err(|e| {
            AppError::gateway_unavailable(format!("Malformed tools/list response: {e}"))
        })?;

        let missing: Vec<&str> = EXPECTED_TOOLS
            .iter()
            .copied()
            .filter(|expected| !tools.iter().any(|t| t.name == *expected))
            .collect();
        if !missing.is_empty() {
            warn!("missing expected tools: {}", missing.join(", "));
        }

        info!("retrieved {} tools from MCP server", tools.len());
        *self.tools_cache.write().await = Some(tools.clone());
        Ok(tools)
    }

    async fn invoke(&self, name: &str, arguments: &Value) -> AppResult<String> {
        debug!(tool = name, "calling tool");

        let mut conn = self.open_connection().await.map_err(|e| {
            AppError::tool_execution(format!("Failed to call tool {name}: {e}"))
        })?;
        let result = conn
            .request(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await;
        conn.close().await;

        let value = result
            .map_err(|e| AppError::tool_execution(format!("Failed to call tool {name}: {e}")))?;
        let call_result: ToolCallResult = serde_json::from_value(value).map_err(|e| {
            AppError::tool_execution(format!("Malformed result from tool {name}: {e}"))
        })?;

        debug!(tool = name, "tool executed successfully");
        Ok(call_result.to_text())
    }
}

/// One short-lived MCP connection
struct McpConnection {
    client: Client,
    endpoint: Url,
    session_id: Option<String>,
    next_request_id: i64,
}

impl McpConnection {
    /// Open a connection: initialize handshake plus initialized notification
    async fn open(client: Client, endpoint: Url) -> AppResult<Self> {
        let mut conn = Self {
            client,
            endpoint,
            session_id: None,
            next_request_id: 1,
        };

        conn.initialize().await?;
        conn.notify("notifications/initialized").await?;
        Ok(conn)
    }

    async fn initialize(&mut self) -> AppResult<()> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": format!("{}-client", service::NAME),
                "version": service::VERSION,
            }
        });

        let request = JsonRpcRequest::with_id("initialize", Some(params), json!(self.take_id()));
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("accept", "application/json, text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("initialize request failed: {e}")))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session.to_owned());
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::internal(format!("initialize response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(AppError::internal(format!(
                "initialize returned {status}: {body}"
            )));
        }

        Self::parse_rpc_result(&body)?;
        Ok(())
    }

    /// Send a request and return the JSON-RPC `result` value
    async fn request(&mut self, method: &str, params: Option<Value>) -> AppResult<Value> {
        let request = JsonRpcRequest::with_id(method, params, json!(self.take_id()));

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("accept", "application/json, text/event-stream")
            .json(&request);
        if let Some(session) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::internal(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::internal(format!("{method} response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(AppError::internal(format!(
                "{method} returned {status}: {body}"
            )));
        }

        Self::parse_rpc_result(&body)
    }

    /// Send a notification (errors on transport failure only)
    async fn notify(&self, method: &str) -> AppResult<()> {
        let request = JsonRpcRequest::notification(method, None);

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("accept", "application/json, text/event-stream")
            .json(&request);
        if let Some(session) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session);
        }

        builder
            .send()
            .await
            .map_err(|e| AppError::internal(format!("{method} notification failed: {e}")))?;
        Ok(())
    }

    /// Close the connection; runs on error paths as well
    async fn close(self) {
        let Some(session) = self.session_id else {
            return;
        };
        let result = self
            .client
            .delete(self.endpoint.clone())
            .header(SESSION_HEADER, &session)
            .send()
            .await;
        if let Err(e) = result {
            warn!("error closing MCP connection: {e}");
        }
    }

    fn take_id(&mut self) -> i64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Extract the `result` from a plain JSON or SSE-framed response body
    fn parse_rpc_result(body: &str) -> AppResult<Value> {
        let response = Self::parse_rpc_response(body)?;
        if let Some(error) = response.error {
            return Err(AppError::internal(format!(
                "JSON-RPC error {}: {}",
                error.code, error.message
            )));
        }
        response
            .result
            .ok_or_else(|| AppError::internal("JSON-RPC response carried no result".to_owned()))
    }

    fn parse_rpc_response(body: &str) -> AppResult<JsonRpcResponse> {
        if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(body) {
            return Ok(response);
        }

        // Streamable HTTP servers may frame the response as an SSE event
        // stream; the response is the first data line that parses.
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(data.trim()) {
                    return Ok(response);
                }
            }
        }

        Err(AppError::internal(format!(
            "unparseable JSON-RPC response body: {}",
            body.chars().take(200).collect::<String>()
        )))
    }
}
