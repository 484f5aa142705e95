// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide session registry.
//!
//! Holds each session's lifecycle status and pending pairing material,
//! mutated keyed per session id (no partial-update races across fields of
//! one session). Status transitions are published on the event bus.
//! Reconnects are single-flight per session: scheduling a second reconnect
//! while one is pending is a no-op.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use kirim_bus::{BusEvent, EventBus};
use kirim_core::types::SessionStatus;
use tracing::{info, warn};

/// State kept per session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub status: SessionStatus,
    /// Pairing QR payload while the session awaits a scan.
    pub qr: Option<String>,
}

/// Registry of all sessions this process owns.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    reconnecting: Arc<DashMap<String, ()>>,
    bus: EventBus,
    reconnect_delay: Duration,
}

impl SessionRegistry {
    pub fn new(bus: EventBus, reconnect_delay: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            reconnecting: Arc::new(DashMap::new()),
            bus,
            reconnect_delay,
        }
    }

    /// Update a session's status and pairing material; publishes a
    /// `SessionStatus` bus event only when something actually changed.
    pub fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        reason: Option<String>,
        qr: Option<String>,
    ) {
        let changed = {
            let mut entry = self
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| SessionEntry {
                    status: SessionStatus::Unknown,
                    qr: None,
                });
            if entry.status == status && entry.qr == qr {
                false
            } else {
                entry.status = status;
                entry.qr = qr;
                true
            }
        };

        if changed {
            info!(session = session_id, status = %status, "session status changed");
            self.bus.publish(BusEvent::SessionStatus {
                session_id: session_id.to_string(),
                status,
                reason,
            });
        }
    }

    /// Current status of a session, if known.
    pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions.get(session_id).map(|e| e.status)
    }

    /// Current entry of a session, if known.
    pub fn entry(&self, session_id: &str) -> Option<SessionEntry> {
        self.sessions.get(session_id).map(|e| e.clone())
    }

    /// All known sessions and their entries.
    pub fn snapshot(&self) -> Vec<(String, SessionEntry)> {
        self.sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Drop a session from the registry (deletion/logout path).
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
        self.reconnecting.remove(session_id);
    }

    /// Schedule a delayed reconnect attempt for a session.
    ///
    /// Single-flight: while an attempt is pending for this session, further
    /// calls are no-ops, so repeated disconnect events cannot accumulate
    /// concurrent connection objects.
    pub fn schedule_reconnect<F, Fut>(&self, session_id: &str, reconnect: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), kirim_core::KirimError>> + Send + 'static,
    {
        use dashmap::mapref::entry::Entry;
        match self.reconnecting.entry(session_id.to_string()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let session_id = session_id.to_string();
        let reconnecting = Arc::clone(&self.reconnecting);
        let delay = self.reconnect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(session = %session_id, "attempting reconnect");
            if let Err(e) = reconnect().await {
                warn!(session = %session_id, error = %e, "reconnect attempt failed");
            }
            reconnecting.remove(&session_id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> (SessionRegistry, tokio::sync::broadcast::Receiver<BusEvent>) {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        (SessionRegistry::new(bus, Duration::from_millis(10)), rx)
    }

    #[tokio::test]
    async fn status_change_publishes_bus_event() {
        let (registry, mut rx) = registry();
        registry.update_status("s1", SessionStatus::Connected, None, None);

        match rx.recv().await.unwrap() {
            BusEvent::SessionStatus { session_id, status, .. } => {
                assert_eq!(session_id, "s1");
                assert_eq!(status, SessionStatus::Connected);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(registry.status("s1"), Some(SessionStatus::Connected));
    }

    #[tokio::test]
    async fn unchanged_status_is_not_rebroadcast() {
        let (registry, mut rx) = registry();
        registry.update_status("s1", SessionStatus::Connected, None, None);
        registry.update_status("s1", SessionStatus::Connected, None, None);

        rx.recv().await.unwrap();
        assert!(
            matches!(rx.try_recv(), Err(tokio::sync::broadcast::error::TryRecvError::Empty)),
            "duplicate status should not publish a second event"
        );
    }

    #[tokio::test]
    async fn qr_change_counts_as_a_change() {
        let (registry, mut rx) = registry();
        registry.update_status("s1", SessionStatus::Connecting, None, Some("qr-1".to_string()));
        registry.update_status("s1", SessionStatus::Connecting, None, Some("qr-2".to_string()));

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert_eq!(registry.entry("s1").unwrap().qr.as_deref(), Some("qr-2"));
    }

    #[tokio::test]
    async fn reconnect_is_single_flight() {
        let (registry, _rx) = registry();
        let attempts = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let attempts = Arc::clone(&attempts);
            registry.schedule_reconnect("s1", move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reconnect_can_run_again_after_completion() {
        let (registry, _rx) = registry();
        let attempts = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&attempts);
        registry.schedule_reconnect("s1", move || async move {
            a.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        tokio::time::sleep(Duration::from_millis(40)).await;

        let a = Arc::clone(&attempts);
        registry.schedule_reconnect("s1", move || async move {
            a.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remove_forgets_the_session() {
        let (registry, _rx) = registry();
        registry.update_status("s1", SessionStatus::Connected, None, None);
        registry.remove("s1");
        assert!(registry.status("s1").is_none());
        assert!(registry.snapshot().is_empty());
    }
}
