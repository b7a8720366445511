// ABOUTME: Session registry mapping session ids to chat service instances
// ABOUTME: Creates on first use, serializes turns per session, evicts idle sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Session Registry
//!
//! Process-scoped registry constructed once at startup and handed to the
//! request handlers by reference — never looked up ambiently — so tests can
//! build registries around fake providers and gateways.
//!
//! Each session owns one `TrafficChatService` behind a `tokio::sync::Mutex`;
//! overlapping messages on the same session queue up rather than interleave.
//! A background sweeper evicts sessions idle past a fixed timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chat::TrafficChatService;
use crate::constants::session::{IDLE_TIMEOUT, SWEEP_INTERVAL};
use crate::errors::{AppError, AppResult};
use crate::llm::LlmProvider;
use crate::mcp::ToolGateway;
use crate::store::SessionStore;

/// One registered session
pub struct Session {
    /// The chat service; the mutex serializes turns for this session
    pub service: Mutex<TrafficChatService>,
    created_at: Instant,
    last_accessed: Mutex<Instant>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn new(service: TrafficChatService) -> Self {
        let now = Instant::now();
        Self {
            service: Mutex::new(service),
            created_at: now,
            last_accessed: Mutex::new(now),
        }
    }

    async fn touch(&self) {
        *self.last_accessed.lock().await = Instant::now();
    }

    async fn idle_for(&self) -> Duration {
        self.last_accessed.lock().await.elapsed()
    }
}

/// Summary of a session's state
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo {
    /// Turns currently buffered
    pub message_count: usize,
    /// Age of the session
    pub age: Duration,
}

/// Registry of active chat sessions
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    provider: Option<Arc<dyn LlmProvider>>,
    gateway: Arc<dyn ToolGateway>,
    store: Arc<dyn SessionStore>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    /// Create a registry around the injected collaborators
    ///
    /// `provider` is `None` when no LLM credential is configured; session
    /// creation then fails while the rest of the server keeps serving.
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        gateway: Arc<dyn ToolGateway>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            provider,
            gateway,
            store,
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    /// Override the idle timeout (tests)
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Get an existing session or create and initialize a new one
    ///
    /// # Errors
    ///
    /// Fails when no LLM provider is configured or when the one-time tool
    /// schema fetch fails; the session is not registered on failure.
    pub async fn get_or_create(&self, session_id: &str) -> AppResult<Arc<Session>> {
        if let Some(entry) = self.sessions.get(session_id) {
            let session = Arc::clone(entry.value());
            drop(entry);
            session.touch().await;
            debug!("retrieved existing session: {session_id}");
            return Ok(session);
        }

        info!("creating new session: {session_id}");
        let provider = self.provider.clone().ok_or_else(|| {
            AppError::config("ANTHROPIC_API_KEY not found in environment variables")
        })?;

        let service = TrafficChatService::initialize(
            session_id,
            provider,
            Arc::clone(&self.gateway),
            Arc::clone(&self.store),
        )
        .await?;

        let session = Arc::new(Session::new(service));
        self.sessions
            .insert(session_id.to_owned(), Arc::clone(&session));
        info!("total active sessions: {}", self.sessions.len());
        Ok(session)
    }

    /// Clear a session's conversation history; returns whether it existed
    pub async fn clear(&self, session_id: &str) -> bool {
        let session = self
            .sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(session) = session {
            session.service.lock().await.clear_history();
            info!("cleared session: {session_id}");
            true
        } else {
            debug!("session not found: {session_id}");
            false
        }
    }

    /// Remove a session entirely; returns whether it existed
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            info!(
                "deleted session: {session_id}, remaining: {}",
                self.sessions.len()
            );
        }
        removed
    }

    /// Number of active sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Peek at a session without refreshing its last-access time
    pub async fn session_info(&self, session_id: &str) -> Option<SessionInfo> {
        let session = self
            .sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))?;
        let message_count = session.service.lock().await.history_len();
        Some(SessionInfo {
            message_count,
            age: session.created_at.elapsed(),
        })
    }

    /// Drop every session
    pub fn clear_all(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        info!("cleared all {count} sessions");
    }

    /// Evict sessions idle past the timeout; returns how many were removed
    pub async fn sweep_expired(&self) -> usize {
        // Snapshot first: awaiting while iterating would hold shard locks.
        let snapshot: Vec<(String, Arc<Session>)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut expired = Vec::new();
        for (session_id, session) in snapshot {
            if session.idle_for().await > self.idle_timeout {
                expired.push(session_id);
            }
        }

        for session_id in &expired {
            self.sessions.remove(session_id);
            info!("cleaned up expired session: {session_id}");
        }
        if !expired.is_empty() {
            info!(
                "cleaned up {} expired sessions, remaining: {}",
                expired.len(),
                self.sessions.len()
            );
        }
        expired.len()
    }

    /// Start the periodic eviction sweep
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            // The first tick fires immediately; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                registry.sweep_expired().await;
            }
        })
    }
}
