// ABOUTME: Best-effort durable store abstraction for mirroring session transcripts
// ABOUTME: Injected trait with append/update operations; failures never surface to users
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Session Store
//!
//! Optional transcript mirroring into a document store so other clients can
//! observe a session live. Writes are strictly best-effort: the chat loop
//! logs failures and continues, and absence of a configured store changes
//! nothing about answers.

pub mod firestore;

pub use firestore::FirestoreStore;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppResult;

/// Durable store for session message documents
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append a message document to a session, returning its id
    async fn append_message(&self, session_id: &str, doc: &Value) -> AppResult<String>;

    /// Merge a partial document into an existing message
    async fn update_message(
        &self,
        session_id: &str,
        message_id: &str,
        patch: &Value,
    ) -> AppResult<()>;
}

/// Store used when no document store is configured
///
/// Accepts every write and invents message ids so the draft-update flow
/// behaves identically with and without a configured backend.
#[derive(Debug, Default)]
pub struct NoopStore;

#[async_trait]
impl SessionStore for NoopStore {
    async fn append_message(&self, _session_id: &str, _doc: &Value) -> AppResult<String> {
        Ok(Uuid::new_v4().to_string())
    }

    async fn update_message(
        &self,
        _session_id: &str,
        _message_id: &str,
        _patch: &Value,
    ) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_store_returns_distinct_ids() {
        let store = NoopStore;
        let first = store.append_message("s1", &json!({"role": "user"})).await.unwrap();
        let second = store.append_message("s1", &json!({"role": "user"})).await.unwrap();
        assert_ne!(first, second);
        store.update_message("s1", &first, &json!({})).await.unwrap();
    }
}
