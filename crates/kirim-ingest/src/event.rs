// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire shapes of inbound provider events.
//!
//! The socket gateway posts `{event, sessionId, timestamp, data}` envelopes
//! with camelCase payloads; every field the pipeline does not need is left
//! in the raw `data` value, so unknown additions never break ingestion.

use serde::{Deserialize, Serialize};

/// The envelope every socket-gateway webhook arrives in.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// An inbound message event.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_mime_type: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default)]
    pub push_name: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// A typing-state change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(default)]
    pub chat: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub media: String,
}

/// A presence update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub last_seen: i64,
}

/// A connection status change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// History sync progress.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySyncPayload {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub progress: i64,
}

/// A push-name change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNamePayload {
    #[serde(default)]
    pub jid: String,
    #[serde(default)]
    pub push_name: String,
    #[serde(default)]
    pub old_name: String,
}

/// A delivery/read receipt. The gateway sends `messageId` as either one id
/// or a list.
#[derive(Debug, Clone, Default)]
pub struct ReceiptPayload {
    pub receipt_type: String,
    pub message_ids: Vec<String>,
    pub from: String,
    pub timestamp: i64,
}

impl ReceiptPayload {
    pub fn from_value(data: &serde_json::Value) -> Self {
        let message_ids = match data.get("messageId") {
            Some(serde_json::Value::String(id)) => vec![id.clone()],
            Some(serde_json::Value::Array(ids)) => ids
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            receipt_type: data
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            message_ids,
            from: data
                .get("from")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            timestamp: data.get("timestamp").and_then(|v| v.as_i64()).unwrap_or(0),
        }
    }
}
