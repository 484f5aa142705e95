// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The webhook ingestion pipeline.
//!
//! Maps each inbound event kind to an idempotent handler. Message events
//! run the full normalization path: tenant resolution, counterpart
//! determination, identity canonicalization (with best-effort resolution of
//! temporary linked identifiers), idempotent contact/chat upsert, content
//! classification, sender-name resolution, append-only persistence, bus
//! broadcast, and isolated webhook fan-out. Unknown event kinds are logged
//! and ignored so new gateway versions cannot break ingestion.

use std::sync::Arc;

use kirim_bus::{BusEvent, EventBus};
use kirim_core::jid::{is_broadcast, is_lid, jid_user, normalize_jid, NormalizeOptions};
use kirim_core::types::{NewMessage, SenderType, SessionStatus, Tenant};
use kirim_core::{KirimError, Store};
use kirim_dispatch::SessionRegistry;
use kirim_notify::AlertNotifier;
use kirim_provider::SocketGatewayClient;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::cloud::transform_cloud_payload;
use crate::event::{
    ConnectionPayload, HistorySyncPayload, MessagePayload, PresencePayload, PushNamePayload,
    ReceiptPayload, TypingPayload, WebhookEnvelope,
};
use crate::forward::Forwarder;

/// Setting key for a session-level default webhook.
fn session_webhook_key(session_id: &str) -> String {
    format!("session_webhook:{session_id}")
}

/// Setting key for the global fallback webhook.
const DEFAULT_WEBHOOK_KEY: &str = "default_webhook_url";

/// The webhook ingestion pipeline.
pub struct IngestPipeline {
    store: Arc<dyn Store>,
    bus: EventBus,
    registry: Arc<SessionRegistry>,
    forwarder: Forwarder,
    country_prefix: String,
    notifier: Option<Arc<AlertNotifier>>,
    socket_client: Option<Arc<SocketGatewayClient>>,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        bus: EventBus,
        registry: Arc<SessionRegistry>,
        country_prefix: &str,
    ) -> Self {
        Self {
            store,
            bus,
            registry,
            forwarder: Forwarder::default(),
            country_prefix: country_prefix.to_string(),
            notifier: None,
            socket_client: None,
        }
    }

    /// Attach the alert notifier for session-down notifications.
    pub fn with_notifier(mut self, notifier: Arc<AlertNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Attach the socket gateway client used for reconnect attempts.
    pub fn with_socket_client(mut self, client: Arc<SocketGatewayClient>) -> Self {
        self.socket_client = Some(client);
        self
    }

    /// The configured cloud webhook verification token, if any.
    pub async fn cloud_verify_token(&self) -> Result<Option<String>, KirimError> {
        self.store
            .system_setting(crate::routes::CLOUD_VERIFY_TOKEN_KEY)
            .await
    }

    fn normalize_opts(&self, is_group: Option<bool>) -> NormalizeOptions {
        NormalizeOptions {
            is_group,
            country_prefix: self.country_prefix.clone(),
        }
    }

    /// Process one socket-gateway webhook envelope.
    ///
    /// Returns `Ok` once persistence and broadcast are done; notification
    /// dispatch continues in the background and cannot affect the
    /// acknowledgment.
    pub async fn handle(&self, envelope: WebhookEnvelope) -> Result<(), KirimError> {
        debug!(event = %envelope.event, session = %envelope.session_id, "webhook received");
        match envelope.event.as_str() {
            "message" => {
                let Some(raw) = envelope.data.get("message") else {
                    return Ok(());
                };
                let payload: MessagePayload = serde_json::from_value(raw.clone())
                    .map_err(|e| KirimError::Validation(format!("bad message payload: {e}")))?;
                self.handle_message(&envelope.session_id, None, payload, true)
                    .await
            }
            "receipt" => {
                let receipt = ReceiptPayload::from_value(&envelope.data);
                self.bus.publish(BusEvent::Receipt {
                    session_id: envelope.session_id,
                    receipt_type: receipt.receipt_type,
                    message_ids: receipt.message_ids,
                    from: receipt.from,
                    timestamp: receipt.timestamp,
                });
                Ok(())
            }
            "typing" => {
                let typing: TypingPayload =
                    serde_json::from_value(envelope.data).unwrap_or_default();
                self.bus.publish(BusEvent::Typing {
                    session_id: envelope.session_id,
                    chat: typing.chat,
                    sender: typing.sender,
                    is_typing: typing.state == "composing",
                    is_recording: typing.media == "audio",
                });
                Ok(())
            }
            "presence" => {
                let presence: PresencePayload =
                    serde_json::from_value(envelope.data).unwrap_or_default();
                self.bus.publish(BusEvent::Presence {
                    session_id: envelope.session_id,
                    jid: presence.from,
                    available: presence.available,
                    last_seen: presence.last_seen,
                });
                Ok(())
            }
            "connection" => {
                let connection: ConnectionPayload =
                    serde_json::from_value(envelope.data).unwrap_or_default();
                self.handle_connection(&envelope.session_id, connection);
                Ok(())
            }
            "history_sync" => {
                let sync: HistorySyncPayload =
                    serde_json::from_value(envelope.data).unwrap_or_default();
                self.bus.publish(BusEvent::HistorySync {
                    session_id: envelope.session_id,
                    sync_type: sync.kind,
                    progress: sync.progress,
                });
                Ok(())
            }
            "push_name" => {
                let push: PushNamePayload =
                    serde_json::from_value(envelope.data).unwrap_or_default();
                self.handle_push_name(&envelope.session_id, push).await
            }
            other => {
                info!(event = %other, "ignoring unknown webhook event kind");
                Ok(())
            }
        }
    }

    /// Process a cloud API webhook body: transform each carried message and
    /// run it through the common message path, routed by phone-number id.
    pub async fn handle_cloud(&self, body: &serde_json::Value) -> Result<(), KirimError> {
        for cloud_msg in transform_cloud_payload(body) {
            if cloud_msg.phone_number_id.is_empty() {
                continue;
            }
            let tenant = match self
                .store
                .tenant_by_cloud_phone_id(&cloud_msg.phone_number_id)
                .await?
            {
                Some(tenant) => tenant,
                None => {
                    warn!(phone_id = %cloud_msg.phone_number_id, "cloud event for unknown tenant");
                    continue;
                }
            };
            let session = tenant.session_id.clone().unwrap_or_default();
            self.handle_message(&session, Some(tenant), cloud_msg.payload, false)
                .await?;
        }
        Ok(())
    }

    /// The shared message path for both providers.
    ///
    /// `via_socket` marks events arriving through the socket-gateway
    /// ingestion channel, which are suppressed for cloud-configured tenants
    /// (a conversation must never be fed by two providers at once).
    async fn handle_message(
        &self,
        session_id: &str,
        tenant: Option<Tenant>,
        payload: MessagePayload,
        via_socket: bool,
    ) -> Result<(), KirimError> {
        let tenant = match tenant {
            Some(tenant) => tenant,
            None => match self.store.tenant_by_session(session_id).await? {
                Some(tenant) => tenant,
                None => {
                    debug!(session = session_id, "message for session without tenant, dropped");
                    return Ok(());
                }
            },
        };

        if via_socket && tenant.provider == kirim_core::types::ProviderKind::Cloud {
            debug!(
                session = session_id,
                tenant = %tenant.id,
                "socket event for cloud-configured tenant suppressed"
            );
            return Ok(());
        }
        if tenant.status != "active" {
            debug!(tenant = %tenant.id, "tenant inactive, message dropped");
            return Ok(());
        }

        // Counterpart: the group for group chats, otherwise the remote end
        // of the conversation.
        let counterpart_raw = if payload.is_group {
            payload.to.as_str()
        } else if payload.is_from_me {
            payload.to.as_str()
        } else {
            payload.from.as_str()
        };

        if is_broadcast(counterpart_raw) {
            debug!("broadcast pseudo-address dropped");
            return Ok(());
        }

        let mut key = normalize_jid(
            counterpart_raw,
            &self.normalize_opts(Some(payload.is_group)),
        );
        if key.is_empty() {
            debug!(raw = counterpart_raw, "unparseable counterpart, event ignored");
            return Ok(());
        }

        // Best-effort temporary-linked-identifier resolution; ingestion
        // never blocks on a missing mapping.
        if is_lid(&key) {
            match self.store.permanent_number_for_lid(&key).await {
                Ok(Some(pn)) => {
                    key = normalize_jid(&pn, &self.normalize_opts(Some(false)));
                }
                Ok(None) => {
                    debug!(lid = %key, "no permanent number mapped yet, keeping ephemeral key");
                }
                Err(e) => {
                    warn!(lid = %key, error = %e, "lid lookup failed, keeping ephemeral key");
                }
            }
        }

        // Duplicate webhook deliveries are not errors.
        if !payload.id.is_empty() && self.store.message_exists(&payload.id).await? {
            debug!(wa_id = %payload.id, "duplicate message delivery ignored");
            return Ok(());
        }

        let display_hint = if payload.is_group {
            (!payload.group_name.is_empty()).then_some(payload.group_name.as_str())
        } else if !payload.is_from_me && !payload.push_name.is_empty() {
            Some(payload.push_name.as_str())
        } else {
            None
        };

        let chat = self
            .store
            .get_or_create_chat(&tenant.id, &key, display_hint, payload.is_group)
            .await?;

        let classified = classify(&payload);

        let (sender_type, sender_name) = if payload.is_from_me {
            (SenderType::Agent, None)
        } else {
            (
                SenderType::Customer,
                Some(self.resolve_sender_name(&tenant.id, &key, &payload).await),
            )
        };

        let stored = self
            .store
            .log_message(NewMessage {
                chat_id: chat.id,
                sender_type,
                sender_name,
                message_type: classified.message_type,
                body: classified.body,
                media_url: classified.media_url,
                wa_message_id: (!payload.id.is_empty()).then(|| payload.id.clone()),
                is_from_me: payload.is_from_me,
            })
            .await?;

        info!(
            tenant = %tenant.id,
            chat = chat.id,
            kind = %stored.message_type,
            from_me = payload.is_from_me,
            "message persisted"
        );

        // Fire-and-forget for subscribers: a broadcast cannot roll back
        // persistence.
        self.bus.publish(BusEvent::Message {
            session_id: session_id.to_string(),
            tenant_id: tenant.id.clone(),
            chat_id: chat.id,
            message: stored,
        });

        // Only truly inbound traffic is forwarded to tenant webhooks.
        if !payload.is_from_me {
            let urls = self.forward_urls(&tenant, session_id).await;
            let forward_payload = serde_json::json!({
                "event": "message",
                "sessionId": session_id,
                "tenantId": tenant.id,
                "tenantName": tenant.company_name,
                "message": payload,
            });
            self.forwarder.fan_out(&urls, &forward_payload).await;
        }

        Ok(())
    }

    /// Sender display name priority: event push name, then the stored
    /// contact name, then a fallback label.
    async fn resolve_sender_name(
        &self,
        tenant_id: &str,
        key: &str,
        payload: &MessagePayload,
    ) -> String {
        if !payload.push_name.is_empty() {
            return payload.push_name.clone();
        }
        match self.store.contact_by_jid(tenant_id, key).await {
            Ok(Some(contact)) => {
                if let Some(name) = contact.display_name.or(contact.push_name) {
                    return name;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "contact lookup for sender name failed"),
        }
        if payload.is_group {
            jid_user(key).to_string()
        } else {
            "Customer".to_string()
        }
    }

    /// Tenant webhooks plus the session-level default webhook.
    async fn forward_urls(&self, tenant: &Tenant, session_id: &str) -> Vec<String> {
        let mut urls = Vec::new();
        match self.store.tenant_webhooks(&tenant.id).await {
            Ok(webhooks) => urls.extend(webhooks.into_iter().map(|w| w.url)),
            Err(e) => warn!(error = %e, "failed to load tenant webhooks"),
        }
        let session_default = match self
            .store
            .system_setting(&session_webhook_key(session_id))
            .await
        {
            Ok(Some(url)) => Some(url),
            Ok(None) => self
                .store
                .system_setting(DEFAULT_WEBHOOK_KEY)
                .await
                .ok()
                .flatten(),
            Err(e) => {
                warn!(error = %e, "failed to load session webhook setting");
                None
            }
        };
        if let Some(url) = session_default {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    /// Connection-state handling: registry update, bus emit, and
    /// best-effort background notification on session-down transitions.
    fn handle_connection(&self, session_id: &str, payload: ConnectionPayload) {
        let status = match payload.status.as_str() {
            "connected" => SessionStatus::Connected,
            "connecting" => SessionStatus::Connecting,
            "disconnected" => SessionStatus::Disconnected,
            "logged_out" => SessionStatus::LoggedOut,
            _ => SessionStatus::Unknown,
        };
        self.registry
            .update_status(session_id, status, payload.reason.clone(), None);

        if matches!(status, SessionStatus::Disconnected | SessionStatus::LoggedOut) {
            if let Some(notifier) = &self.notifier {
                let notifier = Arc::clone(notifier);
                let session_id = session_id.to_string();
                let reason = payload.reason;
                tokio::spawn(async move {
                    notifier
                        .notify_session_down(&session_id, status, reason)
                        .await;
                });
            }

            // Logged-out sessions need a new pairing; only unexpected
            // disconnects reconnect automatically.
            if status == SessionStatus::Disconnected {
                if let Some(client) = &self.socket_client {
                    let client = Arc::clone(client);
                    let sid = session_id.to_string();
                    self.registry.schedule_reconnect(session_id, move || async move {
                        client.login(&sid).await.map(|_| ())
                    });
                }
            }
        }
    }

    async fn handle_push_name(
        &self,
        session_id: &str,
        payload: PushNamePayload,
    ) -> Result<(), KirimError> {
        let key = normalize_jid(&payload.jid, &self.normalize_opts(None));
        if key.is_empty() || payload.push_name.is_empty() {
            return Ok(());
        }
        if let Some(tenant) = self.store.tenant_by_session(session_id).await? {
            self.store
                .update_push_name(&tenant.id, &key, &payload.push_name)
                .await?;
        }
        self.bus.publish(BusEvent::PushName {
            session_id: session_id.to_string(),
            jid: key,
            push_name: payload.push_name,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirim_core::types::ProviderKind;
    use kirim_test_utils::MemoryStore;
    use std::time::Duration;

    fn socket_tenant(session: &str) -> Tenant {
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

    fn cloud_tenant(session: &str, phone_id: &str) -> Tenant {
        Tenant {
            id: "t2".to_string(),
            company_name: "Cloud Co".to_string(),
            status: "active".to_string(),
            provider: ProviderKind::Cloud,
            session_id: Some(session.to_string()),
            cloud_phone_id: Some(phone_id.to_string()),
            cloud_token: Some("tok".to_string()),
        }
    }

    fn pipeline(store: Arc<MemoryStore>) -> (IngestPipeline, EventBus) {
        let bus = EventBus::new();
        let registry = Arc::new(SessionRegistry::new(bus.clone(), Duration::from_millis(5)));
        (
            IngestPipeline::new(store, bus.clone(), registry, "62"),
            bus,
        )
    }

    fn message_envelope(session: &str, message: serde_json::Value) -> WebhookEnvelope {
        WebhookEnvelope {
            event: "message".to_string(),
            session_id: session.to_string(),
            timestamp: 1700000000,
            data: serde_json::json!({ "message": message }),
        }
    }

    #[tokio::test]
    async fn inbound_text_creates_one_chat_one_contact_one_message() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        let envelope = message_envelope(
            "628111",
            serde_json::json!({
                "id": "WAMID.1",
                "from": "628123456789",
                "to": "628111@s.whatsapp.net",
                "type": "text",
                "body": "Hello",
                "isFromMe": false,
                "isGroup": false,
            }),
        );
        pipeline.handle(envelope.clone()).await.unwrap();

        let contacts = store.contacts().await;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].jid, "628123456789@s.whatsapp.net");

        let chats = store.chats().await;
        assert_eq!(chats.len(), 1);

        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_type, SenderType::Customer);
        assert_eq!(messages[0].body, "Hello");
        assert_eq!(messages[0].wa_message_id.as_deref(), Some("WAMID.1"));

        // A duplicated delivery changes nothing.
        pipeline.handle(envelope).await.unwrap();
        assert_eq!(store.messages().await.len(), 1);
        assert_eq!(store.chats().await.len(), 1);
    }

    #[tokio::test]
    async fn socket_events_for_cloud_tenants_are_suppressed() {
        let store = MemoryStore::new();
        store.add_tenant(cloud_tenant("628222", "ph-1")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628222",
                serde_json::json!({
                    "id": "WAMID.2",
                    "from": "628123456789",
                    "type": "text",
                    "body": "Hello",
                }),
            ))
            .await
            .unwrap();

        assert!(store.messages().await.is_empty());
        assert!(store.chats().await.is_empty());
    }

    #[tokio::test]
    async fn group_messages_key_on_the_group_address() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.3",
                    "from": "628123456789@s.whatsapp.net",
                    "to": "628999-1609@g.us",
                    "type": "text",
                    "body": "hi all",
                    "isGroup": true,
                    "groupName": "Support Team",
                }),
            ))
            .await
            .unwrap();

        let contacts = store.contacts().await;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].jid, "628999-1609@g.us");
        assert!(contacts[0].is_group);
        assert_eq!(contacts[0].display_name.as_deref(), Some("Support Team"));

        // No push name and no stored name: falls back to the group's local
        // part.
        let messages = store.messages().await;
        assert_eq!(messages[0].sender_name.as_deref(), Some("628999-1609"));
    }

    #[tokio::test]
    async fn sender_name_falls_back_to_customer_label() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.4",
                    "from": "628123456789",
                    "type": "text",
                    "body": "anonymous",
                }),
            ))
            .await
            .unwrap();

        let messages = store.messages().await;
        assert_eq!(messages[0].sender_name.as_deref(), Some("Customer"));
    }

    #[tokio::test]
    async fn push_name_beats_stored_name_and_fallback() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.5",
                    "from": "628123456789",
                    "type": "text",
                    "body": "hi",
                    "pushName": "Ana",
                }),
            ))
            .await
            .unwrap();

        let messages = store.messages().await;
        assert_eq!(messages[0].sender_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn lid_counterpart_resolves_to_permanent_number_when_mapped() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        store.set_lid("98765@lid", "628123456789").await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.6",
                    "from": "98765@lid",
                    "type": "text",
                    "body": "who am I",
                }),
            ))
            .await
            .unwrap();

        let contacts = store.contacts().await;
        assert_eq!(contacts[0].jid, "628123456789@s.whatsapp.net");
    }

    #[tokio::test]
    async fn unmapped_lid_keeps_the_ephemeral_key() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.7",
                    "from": "98765@lid",
                    "type": "text",
                    "body": "mystery",
                }),
            ))
            .await
            .unwrap();

        let contacts = store.contacts().await;
        assert_eq!(contacts[0].jid, "98765@lid");
        assert_eq!(store.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn broadcast_pseudo_addresses_are_dropped() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.8",
                    "from": "status@broadcast",
                    "type": "text",
                    "body": "story",
                }),
            ))
            .await
            .unwrap();

        assert!(store.chats().await.is_empty());
        assert!(store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn own_messages_persist_as_agent_without_forwarding() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.9",
                    "from": "628111@s.whatsapp.net",
                    "to": "628123456789@s.whatsapp.net",
                    "type": "text",
                    "body": "our reply",
                    "isFromMe": true,
                }),
            ))
            .await
            .unwrap();

        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_type, SenderType::Agent);
        assert!(messages[0].is_from_me);
        // Counterpart is the recipient for outbound traffic.
        assert_eq!(store.contacts().await[0].jid, "628123456789@s.whatsapp.net");
    }

    #[tokio::test]
    async fn cloud_captionless_image_round_trips_to_placeholder() {
        let store = MemoryStore::new();
        store.add_tenant(cloud_tenant("628222", "ph-1")).await;
        let (pipeline, _bus) = pipeline(store.clone());

        let body = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "ph-1" },
                        "contacts": [{ "profile": { "name": "Ana" } }],
                        "messages": [{
                            "id": "wamid.IMG",
                            "from": "628123456789",
                            "type": "image",
                            "image": { "id": "media-99", "mime_type": "image/jpeg" },
                        }],
                    },
                }],
            }],
        });
        pipeline.handle_cloud(&body).await.unwrap();

        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "[Image]");
        assert_eq!(messages[0].media_url.as_deref(), Some("media-99"));
        assert_eq!(messages[0].sender_type, SenderType::Customer);

        // Redelivery of the same cloud message is suppressed by id.
        pipeline.handle_cloud(&body).await.unwrap();
        assert_eq!(store.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn connection_events_update_registry_and_publish() {
        let store = MemoryStore::new();
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let registry = Arc::new(SessionRegistry::new(bus.clone(), Duration::from_millis(5)));
        let pipeline = IngestPipeline::new(store, bus, registry.clone(), "62");

        pipeline
            .handle(WebhookEnvelope {
                event: "connection".to_string(),
                session_id: "628111".to_string(),
                timestamp: 0,
                data: serde_json::json!({ "status": "disconnected", "reason": "stream error" }),
            })
            .await
            .unwrap();

        assert_eq!(registry.status("628111"), Some(SessionStatus::Disconnected));
        match rx.recv().await.unwrap() {
            BusEvent::SessionStatus { status, reason, .. } => {
                assert_eq!(status, SessionStatus::Disconnected);
                assert_eq!(reason.as_deref(), Some("stream error"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_name_event_updates_contact_and_publishes() {
        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        store
            .get_or_create_chat("t1", "628123456789@s.whatsapp.net", None, false)
            .await
            .unwrap();
        let (pipeline, bus) = pipeline(store.clone());
        let mut rx = bus.subscribe();

        pipeline
            .handle(WebhookEnvelope {
                event: "push_name".to_string(),
                session_id: "628111".to_string(),
                timestamp: 0,
                data: serde_json::json!({
                    "jid": "628123456789@s.whatsapp.net",
                    "pushName": "Budi",
                }),
            })
            .await
            .unwrap();

        let contact = store
            .contact_by_jid("t1", "628123456789@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.push_name.as_deref(), Some("Budi"));
        assert!(matches!(rx.recv().await.unwrap(), BusEvent::PushName { .. }));
    }

    #[tokio::test]
    async fn unknown_event_kinds_are_ignored() {
        let store = MemoryStore::new();
        let (pipeline, _bus) = pipeline(store);
        pipeline
            .handle(WebhookEnvelope {
                event: "keepalive".to_string(),
                session_id: "628111".to_string(),
                timestamp: 0,
                data: serde_json::Value::Null,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inbound_messages_fan_out_to_tenant_webhooks() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "event": "message",
                "tenantId": "t1",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        store.add_tenant(socket_tenant("628111")).await;
        store.add_webhook("t1", &format!("{}/hook", server.uri())).await;
        store.add_webhook("t1", &format!("{}/broken", server.uri())).await;
        let (pipeline, _bus) = pipeline(store.clone());

        // One failing subscriber must not affect the other, and the handler
        // still acknowledges.
        pipeline
            .handle(message_envelope(
                "628111",
                serde_json::json!({
                    "id": "WAMID.10",
                    "from": "628123456789",
                    "type": "text",
                    "body": "fan out",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(store.messages().await.len(), 1);
    }
}
