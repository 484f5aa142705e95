// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational alerting on session state transitions.
//!
//! When a session drops to `disconnected` or `logged_out`, administrators
//! are notified on WhatsApp through a dedicated notifier session, and an
//! optional operations webhook receives a JSON alert. Everything here is
//! best-effort: failures are logged, never propagated, and notification
//! runs detached from the webhook acknowledgment path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use kirim_config::model::AlertsConfig;
use kirim_core::jid::{normalize_phone, to_socket_destination};
use kirim_core::types::{SessionStatus, UserContact};
use kirim_core::{Store, WhatsAppProvider};
use kirim_dispatch::DispatchScheduler;
use kirim_provider::{SocketDriver, SocketGatewayClient};
use tracing::{debug, info, warn};

/// System setting key naming the dedicated notifier session.
pub const NOTIFIER_SESSION_KEY: &str = "notifier_session";

/// Hands out a provider bound to a session id.
///
/// The production implementation wraps the socket gateway client; tests
/// substitute a recording provider.
pub trait NotifySender: Send + Sync {
    fn provider_for(&self, session_id: &str) -> Box<dyn WhatsAppProvider>;
}

impl NotifySender for Arc<SocketGatewayClient> {
    fn provider_for(&self, session_id: &str) -> Box<dyn WhatsAppProvider> {
        Box::new(SocketDriver::new(session_id.to_string(), Arc::clone(self)))
    }
}

/// Pushes session-down alerts to administrators and the ops webhook.
pub struct AlertNotifier {
    store: Arc<dyn Store>,
    scheduler: Arc<DispatchScheduler>,
    sender: Arc<dyn NotifySender>,
    http: reqwest::Client,
    alerts: AlertsConfig,
    country_prefix: String,
}

impl AlertNotifier {
    pub fn new(
        store: Arc<dyn Store>,
        scheduler: Arc<DispatchScheduler>,
        sender: Arc<dyn NotifySender>,
        alerts: AlertsConfig,
        country_prefix: String,
    ) -> Self {
        Self {
            store,
            scheduler,
            sender,
            http: reqwest::Client::new(),
            alerts,
            country_prefix,
        }
    }

    /// Notify about a session-down transition.
    ///
    /// Recipients are the owning tenant's users with a phone number plus
    /// all super-administrators, de-duplicated by normalized phone. The
    /// designated notifier session never alerts about its own disconnect.
    /// Every failure is logged and swallowed.
    pub async fn notify_session_down(
        &self,
        session_id: &str,
        status: SessionStatus,
        reason: Option<String>,
    ) {
        self.post_alert_webhook(session_id, status, reason.as_deref())
            .await;

        let notifier_session = match self.store.system_setting(NOTIFIER_SESSION_KEY).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("no notifier session configured, skipping admin notification");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to read notifier session setting");
                return;
            }
        };

        if notifier_session == session_id {
            info!(
                session = session_id,
                "notifier session went down, not notifying itself"
            );
            return;
        }

        let recipients = self.collect_recipients(session_id).await;
        if recipients.is_empty() {
            debug!(session = session_id, "no alert recipients with a phone number");
            return;
        }

        let reason_line = reason.map(|r| format!("\nReason: {r}")).unwrap_or_default();
        let text = format!(
            "WhatsApp session {session_id} is {status}.{reason_line}\n\
             Please check the gateway dashboard."
        );

        let provider: Arc<dyn WhatsAppProvider> =
            Arc::from(self.sender.provider_for(&notifier_session));
        for recipient in recipients {
            let digits = normalize_phone(&recipient.phone_number, &self.country_prefix);
            if digits.is_empty() {
                continue;
            }
            let destination = to_socket_destination(&digits);
            let provider = Arc::clone(&provider);
            let text = text.clone();
            let result = self
                .scheduler
                .schedule(&notifier_session, move || async move {
                    provider.send_text(&destination, &text).await
                })
                .await;
            match result {
                Ok(_) => debug!(to = %recipient.name, "session alert delivered"),
                Err(e) => warn!(to = %recipient.name, error = %e, "session alert failed"),
            }
        }
    }

    /// Tenant users plus super admins, de-duplicated by normalized phone.
    async fn collect_recipients(&self, session_id: &str) -> Vec<UserContact> {
        let mut recipients = Vec::new();

        match self.store.tenant_by_session(session_id).await {
            Ok(Some(tenant)) => match self.store.users_with_phone(&tenant.id, &[]).await {
                Ok(users) => recipients.extend(users),
                Err(e) => warn!(error = %e, "failed to load tenant users for alert"),
            },
            Ok(None) => debug!(session = session_id, "session has no owning tenant"),
            Err(e) => warn!(error = %e, "tenant lookup failed for alert"),
        }

        match self.store.super_admins_with_phone().await {
            Ok(admins) => recipients.extend(admins),
            Err(e) => warn!(error = %e, "failed to load super admins for alert"),
        }

        let mut seen = HashSet::new();
        recipients.retain(|r| seen.insert(normalize_phone(&r.phone_number, &self.country_prefix)));
        recipients
    }

    /// POST the alert to the configured operations webhook, if any.
    async fn post_alert_webhook(
        &self,
        session_id: &str,
        status: SessionStatus,
        reason: Option<&str>,
    ) {
        let Some(url) = &self.alerts.webhook_url else {
            return;
        };
        let payload = serde_json::json!({
            "type": "session_down",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "sessionId": session_id,
            "status": status,
            "reason": reason,
        });
        let result = self
            .http
            .post(url)
            .timeout(Duration::from_millis(self.alerts.timeout_ms))
            .header("X-Alert-Source", "kirim-gateway")
            .json(&payload)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!(session = session_id, "alert webhook delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "alert webhook rejected");
            }
            Err(e) => warn!(error = %e, "alert webhook failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirim_core::types::{DestinationFormat, ProviderKind, Tenant};
    use kirim_test_utils::{MemoryStore, RecordingProvider};

    struct RecordingSender {
        provider: RecordingProvider,
    }

    impl NotifySender for RecordingSender {
        fn provider_for(&self, _session_id: &str) -> Box<dyn WhatsAppProvider> {
            Box::new(self.provider.clone())
        }
    }

    fn tenant(session: &str) -> Tenant {
        Tenant {
            id: "t1".to_string(),
            company_name: "Acme".to_string(),
            status: "active".to_string(),
            provider: ProviderKind::Socket,
            session_id: Some(session.to_string()),
            cloud_phone_id: None,
            cloud_token: None,
        }
    }

    fn notifier(
        store: Arc<MemoryStore>,
        provider: RecordingProvider,
    ) -> AlertNotifier {
        AlertNotifier::new(
            store,
            Arc::new(DispatchScheduler::new(Duration::from_millis(1))),
            Arc::new(RecordingSender { provider }),
            AlertsConfig::default(),
            "62".to_string(),
        )
    }

    #[tokio::test]
    async fn notifies_tenant_users_and_super_admins_once_per_phone() {
        let store = MemoryStore::new();
        store.add_tenant(tenant("628111")).await;
        store.set_setting(NOTIFIER_SESSION_KEY, "628999").await;
        store.add_user("u1", Some("t1"), "Agent A", "agent", "08123456789").await;
        store.add_user("u2", Some("t1"), "Admin B", "admin_agent", "08222").await;
        // Same phone as u1 in international form: must be de-duplicated.
        store.add_user("s1", None, "Root", "super_admin", "628123456789").await;

        let provider = RecordingProvider::new(DestinationFormat::CanonicalJid);
        let n = notifier(store, provider.clone());
        n.notify_session_down("628111", SessionStatus::Disconnected, None).await;

        let sends = provider.sends().await;
        assert_eq!(sends.len(), 2, "duplicate phone should collapse to one send");
        let destinations: Vec<&str> = sends.iter().map(|s| s.to.as_str()).collect();
        assert!(destinations.contains(&"628123456789@s.whatsapp.net"));
        assert!(destinations.contains(&"628222@s.whatsapp.net"));
        assert!(sends[0].body.contains("628111"));
        assert!(sends[0].body.contains("disconnected"));
    }

    #[tokio::test]
    async fn notifier_session_never_alerts_about_itself() {
        let store = MemoryStore::new();
        store.add_tenant(tenant("628999")).await;
        store.set_setting(NOTIFIER_SESSION_KEY, "628999").await;
        store.add_user("s1", None, "Root", "super_admin", "0811").await;

        let provider = RecordingProvider::new(DestinationFormat::CanonicalJid);
        let n = notifier(store, provider.clone());
        n.notify_session_down("628999", SessionStatus::LoggedOut, None).await;

        assert!(provider.sends().await.is_empty());
    }

    #[tokio::test]
    async fn missing_notifier_setting_skips_quietly() {
        let store = MemoryStore::new();
        store.add_tenant(tenant("628111")).await;
        store.add_user("s1", None, "Root", "super_admin", "0811").await;

        let provider = RecordingProvider::new(DestinationFormat::CanonicalJid);
        let n = notifier(store, provider.clone());
        n.notify_session_down("628111", SessionStatus::Disconnected, None).await;

        assert!(provider.sends().await.is_empty());
    }

    #[tokio::test]
    async fn send_failures_do_not_stop_remaining_recipients() {
        let store = MemoryStore::new();
        store.add_tenant(tenant("628111")).await;
        store.set_setting(NOTIFIER_SESSION_KEY, "628999").await;
        store.add_user("u1", Some("t1"), "Agent A", "agent", "0811").await;
        store.add_user("u2", Some("t1"), "Agent B", "agent", "0812").await;

        let provider =
            RecordingProvider::failing(DestinationFormat::CanonicalJid, "gateway down");
        let n = notifier(store, provider.clone());
        // Must not panic or abort; errors are logged per recipient.
        n.notify_session_down("628111", SessionStatus::Disconnected, Some("stream error".into()))
            .await;

        assert!(provider.sends().await.is_empty());
    }

    #[tokio::test]
    async fn alert_webhook_receives_session_down_payload() {
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts"))
            .and(header("X-Alert-Source", "kirim-gateway"))
            .and(body_partial_json(serde_json::json!({
                "type": "session_down",
                "sessionId": "628111",
                "status": "disconnected",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let provider = RecordingProvider::new(DestinationFormat::CanonicalJid);
        let alerts = AlertsConfig {
            webhook_url: Some(format!("{}/alerts", server.uri())),
            timeout_ms: 5000,
        };
        let n = AlertNotifier::new(
            store,
            Arc::new(DispatchScheduler::new(Duration::from_millis(1))),
            Arc::new(RecordingSender { provider }),
            alerts,
            "62".to_string(),
        );
        n.notify_session_down("628111", SessionStatus::Disconnected, None).await;
    }
}
