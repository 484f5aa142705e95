// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory doubles for cross-crate tests: a `Store`/`SecretStore`
//! implementation backed by plain collections, and a recording
//! `WhatsAppProvider`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kirim_core::types::{
    Chat, ClaimedJob, Contact, DestinationFormat, MediaRef, NewMessage, RegistrationCheck,
    SendReceipt, StoredMessage, Tenant, TenantWebhook, UserContact,
};
use kirim_core::{KirimError, SecretStore, Store, WhatsAppProvider};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    tenants: Vec<Tenant>,
    contacts: Vec<Contact>,
    chats: Vec<Chat>,
    messages: Vec<StoredMessage>,
    webhooks: Vec<TenantWebhook>,
    settings: HashMap<String, String>,
    users: Vec<MemoryUser>,
    lids: HashMap<String, String>,
    jobs: Vec<MemoryJob>,
    tokens: HashMap<String, String>,
    next_id: i64,
}

struct MemoryUser {
    contact: UserContact,
    tenant_id: Option<String>,
    role: String,
}

struct MemoryJob {
    claim: ClaimedJob,
    status: String,
    wa_message_id: Option<String>,
    error: Option<String>,
    due: bool,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `Store` + `SecretStore` for tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_tenant(&self, tenant: Tenant) {
        self.state.lock().await.tenants.push(tenant);
    }

    pub async fn add_webhook(&self, tenant_id: &str, url: &str) {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.webhooks.push(TenantWebhook {
            id,
            tenant_id: tenant_id.to_string(),
            url: url.to_string(),
        });
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        self.state
            .lock()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
    }

    pub async fn add_user(
        &self,
        id: &str,
        tenant_id: Option<&str>,
        name: &str,
        role: &str,
        phone_number: &str,
    ) {
        self.state.lock().await.users.push(MemoryUser {
            contact: UserContact {
                id: id.to_string(),
                name: name.to_string(),
                phone_number: phone_number.to_string(),
            },
            tenant_id: tenant_id.map(str::to_string),
            role: role.to_string(),
        });
    }

    pub async fn set_lid(&self, lid: &str, pn: &str) {
        self.state
            .lock()
            .await
            .lids
            .insert(lid.to_string(), pn.to_string());
    }

    /// Seed a pending, due campaign job.
    pub async fn add_claimable_job(&self, claim: ClaimedJob) {
        self.state.lock().await.jobs.push(MemoryJob {
            claim,
            status: "pending".to_string(),
            wa_message_id: None,
            error: None,
            due: true,
        });
    }

    /// Seed a pending job whose campaign is not yet due (or paused).
    pub async fn add_undue_job(&self, claim: ClaimedJob) {
        self.state.lock().await.jobs.push(MemoryJob {
            claim,
            status: "pending".to_string(),
            wa_message_id: None,
            error: None,
            due: false,
        });
    }

    /// Status, external id, and error of a seeded job.
    pub async fn job_outcome(&self, job_id: i64) -> Option<(String, Option<String>, Option<String>)> {
        self.state
            .lock()
            .await
            .jobs
            .iter()
            .find(|j| j.claim.id == job_id)
            .map(|j| (j.status.clone(), j.wa_message_id.clone(), j.error.clone()))
    }

    pub async fn messages(&self) -> Vec<StoredMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn chats(&self) -> Vec<Chat> {
        self.state.lock().await.chats.clone()
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        self.state.lock().await.contacts.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_or_create_chat(
        &self,
        tenant_id: &str,
        jid: &str,
        display_name: Option<&str>,
        is_group: bool,
    ) -> Result<Chat, KirimError> {
        let mut state = self.state.lock().await;

        let contact_id = match state
            .contacts
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.jid == jid)
            .map(|c| c.id)
        {
            Some(id) => {
                if let Some(name) = display_name {
                    if let Some(contact) = state.contacts.iter_mut().find(|c| c.id == id) {
                        if contact.display_name.is_none() {
                            contact.display_name = Some(name.to_string());
                        }
                    }
                }
                id
            }
            None => {
                let id = state.next_id();
                state.contacts.push(Contact {
                    id,
                    tenant_id: tenant_id.to_string(),
                    jid: jid.to_string(),
                    display_name: display_name.map(str::to_string),
                    push_name: None,
                    is_group,
                });
                id
            }
        };

        if let Some(chat) = state
            .chats
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.contact_id == contact_id)
        {
            return Ok(chat.clone());
        }

        let id = state.next_id();
        let chat = Chat {
            id,
            tenant_id: tenant_id.to_string(),
            contact_id,
            status: "open".to_string(),
            assigned_to: None,
            last_message_at: None,
            last_message_preview: None,
            last_message_type: None,
            unread_count: 0,
        };
        state.chats.push(chat.clone());
        Ok(chat)
    }

    async fn contact_by_jid(
        &self,
        tenant_id: &str,
        jid: &str,
    ) -> Result<Option<Contact>, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .contacts
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.jid == jid)
            .cloned())
    }

    async fn update_push_name(
        &self,
        tenant_id: &str,
        jid: &str,
        push_name: &str,
    ) -> Result<(), KirimError> {
        let mut state = self.state.lock().await;
        if let Some(contact) = state
            .contacts
            .iter_mut()
            .find(|c| c.tenant_id == tenant_id && c.jid == jid)
        {
            contact.push_name = Some(push_name.to_string());
        }
        Ok(())
    }

    async fn log_message(&self, message: NewMessage) -> Result<StoredMessage, KirimError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let stored = StoredMessage {
            id,
            chat_id: message.chat_id,
            sender_type: message.sender_type,
            sender_name: message.sender_name,
            message_type: message.message_type,
            body: message.body,
            media_url: message.media_url,
            wa_message_id: message.wa_message_id,
            is_from_me: message.is_from_me,
            created_at: format!("2026-01-01T00:00:{:02}.000Z", id % 60),
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn message_exists(&self, wa_message_id: &str) -> Result<bool, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .messages
            .iter()
            .any(|m| m.wa_message_id.as_deref() == Some(wa_message_id)))
    }

    async fn tenant_by_session(&self, session_id: &str) -> Result<Option<Tenant>, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .tenants
            .iter()
            .find(|t| t.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn tenant_by_cloud_phone_id(
        &self,
        phone_id: &str,
    ) -> Result<Option<Tenant>, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .tenants
            .iter()
            .find(|t| t.cloud_phone_id.as_deref() == Some(phone_id))
            .cloned())
    }

    async fn tenant_webhooks(&self, tenant_id: &str) -> Result<Vec<TenantWebhook>, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .webhooks
            .iter()
            .filter(|w| w.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn system_setting(&self, key: &str) -> Result<Option<String>, KirimError> {
        Ok(self.state.lock().await.settings.get(key).cloned())
    }

    async fn super_admins_with_phone(&self) -> Result<Vec<UserContact>, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .filter(|u| u.role == "super_admin")
            .map(|u| u.contact.clone())
            .collect())
    }

    async fn users_with_phone(
        &self,
        tenant_id: &str,
        roles: &[&str],
    ) -> Result<Vec<UserContact>, KirimError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .filter(|u| u.tenant_id.as_deref() == Some(tenant_id))
            .filter(|u| roles.is_empty() || roles.contains(&u.role.as_str()))
            .map(|u| u.contact.clone())
            .collect())
    }

    async fn permanent_number_for_lid(&self, lid: &str) -> Result<Option<String>, KirimError> {
        Ok(self.state.lock().await.lids.get(lid).cloned())
    }

    async fn claim_due_jobs(&self, limit: i64) -> Result<Vec<ClaimedJob>, KirimError> {
        let mut state = self.state.lock().await;
        let mut claimed = Vec::new();
        for job in state.jobs.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            if job.status == "pending" && job.due {
                job.status = "processing".to_string();
                claimed.push(job.claim.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_job_sent(
        &self,
        job_id: i64,
        _campaign_id: i64,
        wa_message_id: Option<&str>,
    ) -> Result<(), KirimError> {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.iter_mut().find(|j| j.claim.id == job_id) {
            job.status = "sent".to_string();
            job.wa_message_id = wa_message_id.map(str::to_string);
            job.error = None;
        }
        Ok(())
    }

    async fn mark_job_failed(
        &self,
        job_id: i64,
        _campaign_id: i64,
        error: &str,
    ) -> Result<(), KirimError> {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.iter_mut().find(|j| j.claim.id == job_id) {
            job.status = "failed".to_string();
            job.error = Some(error.chars().take(500).collect());
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn token_for_session(&self, session_id: &str) -> Result<Option<String>, KirimError> {
        Ok(self.state.lock().await.tokens.get(session_id).cloned())
    }

    async fn set_token(&self, session_id: &str, token: &str) -> Result<(), KirimError> {
        self.state
            .lock()
            .await
            .tokens
            .insert(session_id.to_string(), token.to_string());
        Ok(())
    }

    async fn delete_token(&self, session_id: &str) -> Result<(), KirimError> {
        self.state.lock().await.tokens.remove(session_id);
        Ok(())
    }
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub to: String,
    pub body: String,
}

/// A `WhatsAppProvider` that records sends instead of performing them.
///
/// Clones share the same log, so a resolver can hand out fresh boxes per
/// call while tests observe every send.
#[derive(Clone)]
pub struct RecordingProvider {
    format: DestinationFormat,
    log: Arc<Mutex<Vec<RecordedSend>>>,
    fail_with: Option<String>,
}

impl RecordingProvider {
    pub fn new(format: DestinationFormat) -> Self {
        Self {
            format,
            log: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// A provider whose sends all fail with the given message.
    pub fn failing(format: DestinationFormat, message: &str) -> Self {
        Self {
            format,
            log: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(message.to_string()),
        }
    }

    pub async fn sends(&self) -> Vec<RecordedSend> {
        self.log.lock().await.clone()
    }
}

#[async_trait]
impl WhatsAppProvider for RecordingProvider {
    fn destination_format(&self) -> DestinationFormat {
        self.format
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<SendReceipt, KirimError> {
        if let Some(message) = &self.fail_with {
            return Err(KirimError::Provider {
                message: message.clone(),
                source: None,
            });
        }
        let mut log = self.log.lock().await;
        log.push(RecordedSend {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(SendReceipt {
            message_id: Some(format!("REC.{}", log.len())),
        })
    }

    async fn send_media(
        &self,
        to: &str,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SendReceipt, KirimError> {
        self.send_text(to, &format!("[media {} {:?}]", media.url, caption))
            .await
    }

    async fn check_registered(&self, phone: &str) -> Result<RegistrationCheck, KirimError> {
        Ok(RegistrationCheck {
            exists: true,
            jid: Some(phone.to_string()),
        })
    }

    async fn fetch_profile_picture(&self, _jid: &str) -> Result<Option<String>, KirimError> {
        Ok(None)
    }
}
