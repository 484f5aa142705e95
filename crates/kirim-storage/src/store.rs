// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`SqliteStore`] is the concrete `Store`/`SecretStore` implementation the
//! rest of the workspace consumes through trait objects.

use async_trait::async_trait;
use kirim_core::types::{
    Chat, ClaimedJob, Contact, NewMessage, StoredMessage, Tenant, TenantWebhook, UserContact,
};
use kirim_core::{KirimError, SecretStore, Store};

use crate::database::Database;
use crate::queries;

/// SQLite-backed data access for the gateway core.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle, for query modules not covered by
    /// the `Store` trait (seeding, admin surfaces).
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_or_create_chat(
        &self,
        tenant_id: &str,
        jid: &str,
        display_name: Option<&str>,
        is_group: bool,
    ) -> Result<Chat, KirimError> {
        queries::chats::get_or_create_chat(&self.db, tenant_id, jid, display_name, is_group).await
    }

    async fn contact_by_jid(
        &self,
        tenant_id: &str,
        jid: &str,
    ) -> Result<Option<Contact>, KirimError> {
        queries::chats::contact_by_jid(&self.db, tenant_id, jid).await
    }

    async fn update_push_name(
        &self,
        tenant_id: &str,
        jid: &str,
        push_name: &str,
    ) -> Result<(), KirimError> {
        queries::chats::update_push_name(&self.db, tenant_id, jid, push_name).await
    }

    async fn log_message(&self, message: NewMessage) -> Result<StoredMessage, KirimError> {
        queries::messages::log_message(&self.db, message).await
    }

    async fn message_exists(&self, wa_message_id: &str) -> Result<bool, KirimError> {
        queries::messages::message_exists(&self.db, wa_message_id).await
    }

    async fn tenant_by_session(&self, session_id: &str) -> Result<Option<Tenant>, KirimError> {
        queries::tenants::tenant_by_session(&self.db, session_id).await
    }

    async fn tenant_by_cloud_phone_id(
        &self,
        phone_id: &str,
    ) -> Result<Option<Tenant>, KirimError> {
        queries::tenants::tenant_by_cloud_phone_id(&self.db, phone_id).await
    }

    async fn tenant_webhooks(&self, tenant_id: &str) -> Result<Vec<TenantWebhook>, KirimError> {
        queries::directory::tenant_webhooks(&self.db, tenant_id).await
    }

    async fn system_setting(&self, key: &str) -> Result<Option<String>, KirimError> {
        queries::directory::system_setting(&self.db, key).await
    }

    async fn super_admins_with_phone(&self) -> Result<Vec<UserContact>, KirimError> {
        queries::directory::super_admins_with_phone(&self.db).await
    }

    async fn users_with_phone(
        &self,
        tenant_id: &str,
        roles: &[&str],
    ) -> Result<Vec<UserContact>, KirimError> {
        queries::directory::users_with_phone(&self.db, tenant_id, roles).await
    }

    async fn permanent_number_for_lid(&self, lid: &str) -> Result<Option<String>, KirimError> {
        queries::directory::permanent_number_for_lid(&self.db, lid).await
    }

    async fn claim_due_jobs(&self, limit: i64) -> Result<Vec<ClaimedJob>, KirimError> {
        queries::campaigns::claim_due_jobs(&self.db, limit).await
    }

    async fn mark_job_sent(
        &self,
        job_id: i64,
        campaign_id: i64,
        wa_message_id: Option<&str>,
    ) -> Result<(), KirimError> {
        queries::campaigns::mark_job_sent(&self.db, job_id, campaign_id, wa_message_id).await
    }

    async fn mark_job_failed(
        &self,
        job_id: i64,
        campaign_id: i64,
        error: &str,
    ) -> Result<(), KirimError> {
        queries::campaigns::mark_job_failed(&self.db, job_id, campaign_id, error).await
    }
}

#[async_trait]
impl SecretStore for SqliteStore {
    async fn token_for_session(&self, session_id: &str) -> Result<Option<String>, KirimError> {
        queries::secrets::token_for_session(&self.db, session_id).await
    }

    async fn set_token(&self, session_id: &str, token: &str) -> Result<(), KirimError> {
        queries::secrets::set_token(&self.db, session_id, token).await
    }

    async fn delete_token(&self, session_id: &str) -> Result<(), KirimError> {
        queries::secrets::delete_token(&self.db, session_id).await
    }
}
