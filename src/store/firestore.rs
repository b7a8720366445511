// ABOUTME: Firestore REST implementation of the session store
// ABOUTME: Encodes JSON documents into Firestore typed fields, merge-patches by field mask
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Firestore Store
//!
//! Mirrors session transcripts into
//! `sessions/{session_id}/messages/{message_id}` documents via the Firestore
//! REST API. Documents are encoded into Firestore's typed value format;
//! updates send an explicit field mask so they merge rather than replace.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::SessionStore;
use crate::config::FirestoreConfig;
use crate::errors::{AppError, AppResult};

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";

/// Firestore-backed session store
pub struct FirestoreStore {
    project_id: String,
    api_key: String,
    client: Client,
}

impl FirestoreStore {
    /// Create a store from Firestore credentials
    #[must_use]
    pub fn new(config: &FirestoreConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            client: Client::new(),
        }
    }

    fn documents_base(&self) -> String {
        format!(
            "{FIRESTORE_BASE}/projects/{}/databases/(default)/documents",
            self.project_id
        )
    }
}

#[async_trait]
impl SessionStore for FirestoreStore {
    async fn append_message(&self, session_id: &str, doc: &Value) -> AppResult<String> {
        let url = format!(
            "{}/sessions/{session_id}/messages?key={}",
            self.documents_base(),
            self.api_key
        );

        let mut document = doc.clone();
        if let Value::Object(map) = &mut document {
            map.insert("createdAt".into(), json!(Utc::now().to_rfc3339()));
        }

        let body = json!({ "fields": encode_fields(&document)? });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::persistence(format!("Firestore write error: {e}")))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::persistence(format!("Firestore response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(AppError::persistence(format!(
                "Firestore write returned {status}: {payload}"
            )));
        }

        // Document resource name ends with the generated message id.
        payload
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.rsplit('/').next())
            .map(ToOwned::to_owned)
            .ok_or_else(|| AppError::persistence("Firestore response carried no document name"))
    }

    async fn update_message(
        &self,
        session_id: &str,
        message_id: &str,
        patch: &Value,
    ) -> AppResult<()> {
        let mut document = patch.clone();
        if let Value::Object(map) = &mut document {
            map.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
        }

        let Value::Object(map) = &document else {
            return Err(AppError::persistence("Firestore patch must be an object"));
        };

        // The field mask limits the update to the supplied fields (merge).
        let mask: String = map
            .keys()
            .map(|key| format!("updateMask.fieldPaths={key}"))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!(
            "{}/sessions/{session_id}/messages/{message_id}?key={}&{mask}",
            self.documents_base(),
            self.api_key
        );

        let body = json!({ "fields": encode_fields(&document)? });
        let response = self
            .client
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::persistence(format!("Firestore update error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let payload = response.text().await.unwrap_or_default();
            return Err(AppError::persistence(format!(
                "Firestore update returned {status}: {payload}"
            )));
        }
        Ok(())
    }
}

/// Encode a JSON object into Firestore's `fields` map
fn encode_fields(doc: &Value) -> AppResult<Value> {
    let Value::Object(map) = doc else {
        return Err(AppError::persistence("Firestore document must be an object"));
    };
    let mut fields = Map::new();
    for (key, value) in map {
        fields.insert(key.clone(), encode_value(value));
    }
    Ok(Value::Object(fields))
}

/// Encode one JSON value into Firestore's typed value format
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({"nullValue": null}),
        Value::Bool(b) => json!({"booleanValue": b}),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({"doubleValue": n.as_f64()}),
            // Firestore represents integers as strings on the wire.
            |i| json!({"integerValue": i.to_string()}),
        ),
        Value::String(s) => json!({"stringValue": s}),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({"arrayValue": {"values": values}})
        }
        Value::Object(map) => {
            let mut fields = Map::new();
            for (key, item) in map {
                fields.insert(key.clone(), encode_value(item));
            }
            json!({"mapValue": {"fields": fields}})
        }
    }
}
