// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The cross-crate types live in `kirim-core::types`; this module
//! re-exports them and adds the rows only the storage layer itself needs.

use serde::{Deserialize, Serialize};

pub use kirim_core::types::{
    Chat, ClaimedJob, Contact, NewMessage, StoredMessage, Tenant, TenantWebhook, UserContact,
};

/// A bulk-send campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub tenant_id: String,
    pub name: String,
    pub message_template: String,
    pub scheduled_at: String,
    pub status: String,
    pub success_count: i64,
    pub failed_count: i64,
}

/// One recipient job of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignJob {
    pub id: i64,
    pub campaign_id: i64,
    pub phone_number: String,
    pub status: String,
    pub wa_message_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub sent_at: Option<String>,
}
