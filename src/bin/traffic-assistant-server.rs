// ABOUTME: Server binary wiring configuration, registry, and HTTP routes together
// ABOUTME: Starts the Axum listener and the background session eviction sweeper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Traffic Assistant Server Binary
//!
//! Starts the chat API over the configured LLM provider, MCP tool server,
//! and optional Firestore transcript mirror.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use traffic_assistant::config::ServerConfig;
use traffic_assistant::llm::{AnthropicProvider, LlmProvider};
use traffic_assistant::logging;
use traffic_assistant::mcp::TrafficMcpClient;
use traffic_assistant::routes::{ApiRoutes, ServerState};
use traffic_assistant::session::SessionRegistry;
use traffic_assistant::store::{FirestoreStore, NoopStore, SessionStore};

#[derive(Parser)]
#[command(name = "traffic-assistant-server")]
#[command(about = "Traffic assistant - LLM chat over MCP traffic tools")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Traffic Assistant Server");
    info!("{}", config.summary());

    let provider: Option<Arc<dyn LlmProvider>> = config
        .anthropic_api_key
        .as_ref()
        .map(|key| Arc::new(AnthropicProvider::new(key.as_str())) as Arc<dyn LlmProvider>);

    let gateway = Arc::new(TrafficMcpClient::new(config.mcp_server_url.clone()));

    let store: Arc<dyn SessionStore> = config.firestore.as_ref().map_or_else(
        || Arc::new(NoopStore) as Arc<dyn SessionStore>,
        |firestore| Arc::new(FirestoreStore::new(firestore)) as Arc<dyn SessionStore>,
    );

    let registry = Arc::new(SessionRegistry::new(
        provider,
        gateway.clone(),
        store,
    ));
    let sweeper = registry.spawn_sweeper();
    info!("started periodic session cleanup");

    let state = Arc::new(ServerState {
        registry,
        gateway,
        mcp_configured: config.mcp_configured(),
        anthropic_configured: config.anthropic_configured(),
    });
    let router = ApiRoutes::router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    info!("listening on {addr}");
    display_available_endpoints(config.http_port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    // Serve until interrupted.
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

fn display_available_endpoints(port: u16) {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());

    info!("=== Available API Endpoints ===");
    info!("   Chat:          POST http://{host}:{port}/chat");
    info!("   Clear Session: POST http://{host}:{port}/clear/{{session_id}}");
    info!("   Health Check:  GET  http://{host}:{port}/health");
    info!("   List Tools:    GET  http://{host}:{port}/tools");
    info!("=== End of Endpoint List ===");
}
