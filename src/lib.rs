// ABOUTME: Main library entry point for the traffic assistant chat server
// ABOUTME: Orchestrates LLM completions and MCP traffic tools behind a JSON HTTP API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

#![deny(unsafe_code)]

//! # Traffic Assistant Server
//!
//! A chat server that answers natural-language questions about road traffic.
//! Intelligence is delegated to an external LLM completion API; tool
//! capabilities (geocoding, traffic lookups, predictions, routing) are
//! delegated to an external MCP tool server. This crate is the glue with
//! real control flow: the agent loop, the bounded conversation buffer, the
//! map-data fusion, and the per-session registry.
//!
//! ## Architecture
//!
//! - **chat**: the per-session orchestration loop and its collaborators
//! - **llm**: LLM provider abstraction plus the Anthropic implementation
//! - **mcp**: tool gateway over MCP streamable HTTP
//! - **session**: registry mapping session ids to chat services
//! - **store**: best-effort transcript mirroring into a document store
//! - **routes**: the Axum HTTP surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use traffic_assistant::config::ServerConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! println!("Traffic assistant configured: {}", config.summary());
//! # Ok(())
//! # }
//! ```

/// Conversational core: agent loop, history, map folding, progress
pub mod chat;

/// Environment-based configuration management
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Unified JSON-RPC 2.0 foundation for the MCP client
pub mod jsonrpc;

/// LLM provider abstraction for chat completion
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// Tool gateway over the external MCP tool service
pub mod mcp;

/// Common data models for traffic map payloads
pub mod models;

/// HTTP routes for the chat API
pub mod routes;

/// Session registry with idle eviction
pub mod session;

/// Best-effort durable store for session transcripts
pub mod store;
