// ABOUTME: Unified error handling with standard error codes and HTTP response formatting
// ABOUTME: Defines the AppError type shared by the chat loop, gateway, and route handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Unified Error Handling System
//!
//! Central error type for the traffic assistant server. Each error carries a
//! code from the taxonomy below; the code decides the HTTP status when an
//! error reaches the route boundary. Only validation and reasoning-API
//! failures are expected to surface as HTTP errors — tool failures are fed
//! back to the model as tool-result text, and persistence failures are
//! swallowed with a warning.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed or empty inbound request
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    /// The MCP tool service could not be reached for schema listing
    #[serde(rename = "GATEWAY_UNAVAILABLE")]
    GatewayUnavailable,
    /// A specific tool invocation failed or returned unusable content
    #[serde(rename = "TOOL_EXECUTION_ERROR")]
    ToolExecution,
    /// The LLM completion call itself failed (network/auth/rate-limit)
    #[serde(rename = "REASONING_API_ERROR")]
    ReasoningApi,
    /// The tool-calling loop exceeded its iteration cap
    #[serde(rename = "ITERATION_LIMIT_EXCEEDED")]
    IterationLimit,
    /// A durable-store write failed
    #[serde(rename = "PERSISTENCE_ERROR")]
    Persistence,
    /// Required configuration is missing or invalid
    #[serde(rename = "CONFIG_ERROR")]
    Config,
    /// An internal server error occurred
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            // Everything else that escapes to the HTTP boundary is a 500
            // with an `{"error": ...}` body per the public API contract.
            Self::GatewayUnavailable
            | Self::ToolExecution
            | Self::ReasoningApi
            | Self::IterationLimit
            | Self::Persistence
            | Self::Config
            | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a short description of this error class
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::GatewayUnavailable => "The tool service is unreachable",
            Self::ToolExecution => "Tool execution failed",
            Self::ReasoningApi => "The reasoning API call failed",
            Self::IterationLimit => "Tool-calling iteration limit exceeded",
            Self::Persistence => "Durable store write failed",
            Self::Config => "Configuration error encountered",
            Self::Internal => "An internal server error occurred",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Invalid input (400)
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Tool service unreachable
    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GatewayUnavailable, message)
    }

    /// A tool invocation failed
    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ToolExecution, message)
    }

    /// The LLM completion call failed
    pub fn reasoning_api(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReasoningApi, message)
    }

    /// A best-effort durable-store write failed
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Persistence, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body: `{"error": "..."}` as exposed by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: error.message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        tracing::error!(code = ?self.code, status = %status, "request failed: {}", self.message);
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(
            ErrorCode::InvalidInput.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ReasoningApi.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::GatewayUnavailable.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_body() {
        let error = AppError::invalid_input("Message cannot be empty");
        let body = serde_json::to_string(&ErrorResponse::from(error)).unwrap();
        assert_eq!(body, r#"{"error":"Message cannot be empty"}"#);
    }

    #[test]
    fn test_error_display_includes_class() {
        let error = AppError::reasoning_api("connection reset");
        assert!(error.to_string().contains("reasoning API"));
        assert!(error.to_string().contains("connection reset"));
    }
}
