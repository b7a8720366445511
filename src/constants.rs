// ABOUTME: System-wide constants and environment-based configuration defaults
// ABOUTME: Contains conversation limits, session lifetimes, map zoom levels, and env helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Constants Module
//!
//! Application constants and environment variable configuration helpers.

/// Conversation and tool-loop limits
pub mod limits {
    /// Maximum conversation turns kept in the buffer (~10 user/assistant
    /// round trips)
    pub const MAX_HISTORY_MESSAGES: usize = 20;

    /// Character budget for a single tool result (~5K tokens)
    pub const MAX_TOOL_RESULT_CHARS: usize = 20_000;

    /// Maximum tool-calling rounds before the loop returns whatever text
    /// exists
    pub const MAX_TOOL_ITERATIONS: usize = 10;

    /// Words per line when reformatting model explanations into progress
    /// messages
    pub const PROGRESS_WORDS_PER_LINE: usize = 15;

    /// Token budget passed to the LLM completion call
    pub const MAX_COMPLETION_TOKENS: u32 = 4096;
}

/// Session registry lifetimes
pub mod session {
    use std::time::Duration;

    /// Idle time after which a session is evicted
    pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    /// Period of the background eviction sweep
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Session id used when the client does not supply one
    pub const DEFAULT_SESSION_ID: &str = "default";
}

/// Map framing defaults
pub mod map {
    /// Zoom used when only a geocode result is available for the turn
    pub const GEOCODE_FALLBACK_ZOOM: f64 = 13.0;

    /// Zoom used to frame a full origin-to-destination route
    pub const ROUTE_OVERVIEW_ZOOM: f64 = 10.0;
}

/// Client-side timeouts for outbound calls
pub mod timeouts {
    use std::time::Duration;

    /// End-to-end timeout for one LLM completion round trip
    pub const REASONING_API: Duration = Duration::from_secs(120);

    /// End-to-end timeout for one MCP tool invocation
    pub const TOOL_INVOKE: Duration = Duration::from_secs(60);
}

/// Service identity
pub mod service {
    /// Service name used in logs and MCP client identification
    pub const NAME: &str = "traffic-assistant";

    /// Service version from Cargo.toml
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Environment-based configuration helpers
pub mod env_config {
    use std::env;

    /// Default HTTP port for the chat server
    pub const DEFAULT_HTTP_PORT: u16 = 8081;

    /// Default MCP tool server endpoint
    pub const DEFAULT_MCP_SERVER_URL: &str = "http://localhost:8080/mcp";

    /// Get the HTTP server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HTTP_PORT)
    }

    /// Get the MCP tool server URL from environment or default
    #[must_use]
    pub fn mcp_server_url() -> String {
        env::var("MCP_SERVER_URL").unwrap_or_else(|_| DEFAULT_MCP_SERVER_URL.into())
    }

    /// Get the Anthropic API key from environment
    #[must_use]
    pub fn anthropic_api_key() -> Option<String> {
        env::var("ANTHROPIC_API_KEY").ok().filter(|v| !v.is_empty())
    }

    /// Get the Firestore project id from environment
    #[must_use]
    pub fn firebase_project_id() -> Option<String> {
        env::var("FIREBASE_PROJECT_ID").ok().filter(|v| !v.is_empty())
    }

    /// Get the Firebase API key from environment
    #[must_use]
    pub fn firebase_api_key() -> Option<String> {
        env::var("FIREBASE_API_KEY").ok().filter(|v| !v.is_empty())
    }
}
