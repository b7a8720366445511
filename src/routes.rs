// ABOUTME: HTTP route handlers for the chat, clear, health, and tools endpoints
// ABOUTME: Translates between the JSON API contract and the session registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # API Routes
//!
//! JSON-over-HTTP surface of the server, CORS-open. Handlers receive the
//! process-scoped state by reference through Axum state — nothing is looked
//! up ambiently, so tests drive these routes with injected fakes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use http::header::HeaderName;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::constants::session::DEFAULT_SESSION_ID;
use crate::errors::{AppError, AppResult};
use crate::mcp::ToolGateway;
use crate::models::{ToolProgress, TrafficMapData};
use crate::session::SessionRegistry;

/// Process-scoped state shared by all request handlers
pub struct ServerState {
    /// Session registry owning the chat services
    pub registry: Arc<SessionRegistry>,
    /// Tool gateway, used directly by the `/tools` endpoint
    pub gateway: Arc<dyn ToolGateway>,
    /// Whether an MCP endpoint was explicitly configured
    pub mcp_configured: bool,
    /// Whether an LLM credential is configured
    pub anthropic_configured: bool,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    /// User message (validated non-empty)
    #[serde(default)]
    pub message: Option<String>,
    /// Session identifier, defaulting to a shared session
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response of `POST /chat`
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    /// Final assistant text
    pub response: String,
    /// Session the turn ran in
    pub session_id: String,
    /// Map payload for the turn, when tools produced one
    #[serde(rename = "mapData", skip_serializing_if = "Option::is_none")]
    pub map_data: Option<TrafficMapData>,
    /// Tool progress records, when tools ran
    #[serde(rename = "toolProgress", skip_serializing_if = "Option::is_none")]
    pub tool_progress: Option<Vec<ToolProgress>>,
}

/// Response of `POST /clear/{session_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponseBody {
    /// Human-readable outcome
    pub message: String,
    /// Whether the session existed
    pub success: bool,
}

/// Response of `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponseBody {
    /// Overall status string
    pub status: String,
    /// RFC3339 timestamp of the check
    pub timestamp: String,
    /// Number of active sessions
    pub sessions: usize,
    /// Whether an MCP endpoint is configured
    pub mcp_configured: bool,
    /// Whether an LLM credential is configured
    pub anthropic_configured: bool,
}

/// One entry of `GET /tools`
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
}

// ============================================================================
// Router
// ============================================================================

/// API routes handler
pub struct ApiRoutes;

impl ApiRoutes {
    /// Build the router over the shared server state
    pub fn router(state: Arc<ServerState>) -> Router {
        Router::new()
            .route("/chat", post(Self::chat))
            .route("/clear/:session_id", post(Self::clear_session))
            .route("/health", get(Self::health))
            .route("/tools", get(Self::tools))
            .layer(TraceLayer::new_for_http())
            .layer(Self::cors_layer())
            .with_state(state)
    }

    /// CORS-open policy: any origin, preflight handled by the layer
    fn cors_layer() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_headers([HeaderName::from_static("content-type")])
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    }

    /// `POST /chat` — run one chat turn in the given session
    async fn chat(
        State(state): State<Arc<ServerState>>,
        Json(body): Json<ChatRequestBody>,
    ) -> AppResult<Response> {
        let Some(message) = body.message else {
            return Err(AppError::invalid_input("Invalid message format"));
        };
        if message.trim().is_empty() {
            return Err(AppError::invalid_input("Message cannot be empty"));
        }
        let session_id = body
            .session_id
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_owned());

        info!("received message from session {session_id}");

        let result = async {
            let session = state.registry.get_or_create(&session_id).await?;
            let mut service = session.service.lock().await;
            service.chat(&message, None).await
        }
        .await
        .map_err(|e| AppError::new(e.code, format!("Error processing chat: {}", e.message)))?;

        let response = ChatResponseBody {
            response: result.response,
            session_id,
            map_data: result.map_data,
            tool_progress: if result.tool_progress.is_empty() {
                None
            } else {
                Some(result.tool_progress)
            },
        };
        Ok(Json(response).into_response())
    }

    /// `POST /clear/{session_id}` — reset a session's conversation history
    async fn clear_session(
        State(state): State<Arc<ServerState>>,
        Path(session_id): Path<String>,
    ) -> Response {
        info!("clearing session: {session_id}");
        let cleared = state.registry.clear(&session_id).await;

        let body = if cleared {
            ClearResponseBody {
                message: format!("Session {session_id} cleared"),
                success: true,
            }
        } else {
            ClearResponseBody {
                message: format!("Session {session_id} not found"),
                success: false,
            }
        };
        Json(body).into_response()
    }

    /// `GET /health` — liveness plus configuration flags
    async fn health(State(state): State<Arc<ServerState>>) -> Response {
        let body = HealthResponseBody {
            status: "healthy".to_owned(),
            timestamp: Utc::now().to_rfc3339(),
            sessions: state.registry.session_count(),
            mcp_configured: state.mcp_configured,
            anthropic_configured: state.anthropic_configured,
        };
        Json(body).into_response()
    }

    /// `GET /tools` — list the tool service's advertised tools
    async fn tools(State(state): State<Arc<ServerState>>) -> AppResult<Response> {
        info!("fetching available tools");
        let tools = state
            .gateway
            .list_tools()
            .await
            .map_err(|e| AppError::new(e.code, format!("Error fetching tools: {}", e.message)))?;

        let body: Vec<ToolInfo> = tools
            .into_iter()
            .map(|tool| ToolInfo {
                name: tool.name,
                description: tool.description,
            })
            .collect();
        Ok(Json(body).into_response())
    }
}
