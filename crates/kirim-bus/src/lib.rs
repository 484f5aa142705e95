// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus for the Kirim gateway.
//!
//! The ingestion pipeline publishes enriched inbound events and session
//! state transitions here; real-time subscribers (WebSocket bridges, the
//! notifier, tests) consume them via [`EventBus::subscribe`]. Publishing is
//! fire-and-forget: a slow or absent subscriber never affects the
//! publisher.

use kirim_core::types::{SessionStatus, StoredMessage};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default channel capacity. Subscribers that lag beyond this many events
/// miss the oldest ones.
const DEFAULT_CAPACITY: usize = 512;

/// Events published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A message was persisted for a chat.
    Message {
        session_id: String,
        tenant_id: String,
        chat_id: i64,
        message: StoredMessage,
    },
    /// A delivery/read receipt arrived.
    Receipt {
        session_id: String,
        receipt_type: String,
        message_ids: Vec<String>,
        from: String,
        timestamp: i64,
    },
    /// A typing-state change.
    Typing {
        session_id: String,
        chat: String,
        sender: String,
        is_typing: bool,
        is_recording: bool,
    },
    /// A presence update.
    Presence {
        session_id: String,
        jid: String,
        available: bool,
        last_seen: i64,
    },
    /// A session changed lifecycle status.
    SessionStatus {
        session_id: String,
        status: SessionStatus,
        reason: Option<String>,
    },
    /// History sync progress from the socket gateway.
    HistorySync {
        session_id: String,
        sync_type: String,
        progress: i64,
    },
    /// A contact changed its push name.
    PushName {
        session_id: String,
        jid: String,
        push_name: String,
    },
}

/// A clonable handle to the process-wide event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it. Zero subscribers
    /// is not an error.
    pub fn publish(&self, event: BusEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("bus event dropped: no subscribers");
                0
            }
        }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
