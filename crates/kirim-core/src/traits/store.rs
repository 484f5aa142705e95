// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-access interface consumed by the dispatch, ingestion, campaign, and
//! notification components.
//!
//! The storage engine itself is a collaborator; everything in the pipeline
//! talks to it through this trait so tests can substitute an in-memory
//! implementation.

use async_trait::async_trait;

use crate::error::KirimError;
use crate::types::{
    Chat, ClaimedJob, Contact, NewMessage, StoredMessage, Tenant, TenantWebhook, UserContact,
};

/// The storage surface the gateway core depends on.
#[async_trait]
pub trait Store: Send + Sync {
    /// Find or create the chat for a (tenant, canonical JID) pair.
    ///
    /// Idempotent: calling twice for the same pair yields the same chat.
    /// Creates the backing contact when absent.
    async fn get_or_create_chat(
        &self,
        tenant_id: &str,
        jid: &str,
        display_name: Option<&str>,
        is_group: bool,
    ) -> Result<Chat, KirimError>;

    /// Look up a contact by its canonical JID within a tenant.
    async fn contact_by_jid(
        &self,
        tenant_id: &str,
        jid: &str,
    ) -> Result<Option<Contact>, KirimError>;

    /// Record a push-name observation for a contact, creating nothing.
    async fn update_push_name(
        &self,
        tenant_id: &str,
        jid: &str,
        push_name: &str,
    ) -> Result<(), KirimError>;

    /// Append a message to its chat's timeline.
    async fn log_message(&self, message: NewMessage) -> Result<StoredMessage, KirimError>;

    /// Whether a message with this external id was already persisted.
    async fn message_exists(&self, wa_message_id: &str) -> Result<bool, KirimError>;

    /// The tenant owning a socket session id, if any.
    async fn tenant_by_session(&self, session_id: &str) -> Result<Option<Tenant>, KirimError>;

    /// The tenant owning a cloud phone-number id, if any.
    async fn tenant_by_cloud_phone_id(
        &self,
        phone_id: &str,
    ) -> Result<Option<Tenant>, KirimError>;

    /// All outbound webhooks configured for a tenant.
    async fn tenant_webhooks(&self, tenant_id: &str) -> Result<Vec<TenantWebhook>, KirimError>;

    /// A system-wide setting value.
    async fn system_setting(&self, key: &str) -> Result<Option<String>, KirimError>;

    /// Active super-administrators with a phone number on file.
    async fn super_admins_with_phone(&self) -> Result<Vec<UserContact>, KirimError>;

    /// Active users of a tenant with a phone number, optionally filtered
    /// by role.
    async fn users_with_phone(
        &self,
        tenant_id: &str,
        roles: &[&str],
    ) -> Result<Vec<UserContact>, KirimError>;

    /// The permanent number mapped to a temporary linked identifier, when
    /// the mapping has arrived.
    async fn permanent_number_for_lid(&self, lid: &str) -> Result<Option<String>, KirimError>;

    /// Atomically claim up to `limit` pending jobs of due, un-paused
    /// campaigns, marking them `processing`. A claimed job is invisible to
    /// every other claimant until its outcome is recorded.
    async fn claim_due_jobs(&self, limit: i64) -> Result<Vec<ClaimedJob>, KirimError>;

    /// Record a successful send for a claimed job.
    async fn mark_job_sent(
        &self,
        job_id: i64,
        campaign_id: i64,
        wa_message_id: Option<&str>,
    ) -> Result<(), KirimError>;

    /// Record a failed send for a claimed job. `error` is truncated by the
    /// implementation to a bounded length.
    async fn mark_job_failed(
        &self,
        job_id: i64,
        campaign_id: i64,
        error: &str,
    ) -> Result<(), KirimError>;
}
