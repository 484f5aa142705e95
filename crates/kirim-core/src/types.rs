// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Kirim workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which backend integration a tenant is configured for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Self-hosted device-emulation gateway, driven over per-session HTTP.
    Socket,
    /// Hosted cloud API (Graph-style, phone-id + token).
    Cloud,
}

/// Lifecycle status of a WhatsApp session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connecting,
    Connected,
    Disconnected,
    LoggedOut,
    Unknown,
}

/// Classification of who produced a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Agent,
    System,
}

/// Address format a provider driver expects for outbound destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationFormat {
    /// Canonical `user@domain` JID (socket driver).
    CanonicalJid,
    /// Bare digits with country code, no domain suffix (cloud driver).
    BareDigits,
}

/// A tenant and its active provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub company_name: String,
    pub status: String,
    pub provider: ProviderKind,
    /// Session identifier for the socket driver (the tenant's WA number).
    pub session_id: Option<String>,
    /// Phone-number id for the cloud driver.
    pub cloud_phone_id: Option<String>,
    /// Access token for the cloud driver.
    pub cloud_token: Option<String>,
}

/// A contact, unique per (tenant, canonical JID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub tenant_id: String,
    pub jid: String,
    pub display_name: Option<String>,
    pub push_name: Option<String>,
    pub is_group: bool,
}

/// A chat, unique per (tenant, contact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub tenant_id: String,
    pub contact_id: i64,
    pub status: String,
    pub assigned_to: Option<String>,
    pub last_message_at: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_type: Option<String>,
    pub unread_count: i64,
}

/// Input for appending a message to a chat's timeline.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub sender_type: SenderType,
    pub sender_name: Option<String>,
    pub message_type: String,
    pub body: String,
    pub media_url: Option<String>,
    /// External message id from the provider, for receipt correlation.
    pub wa_message_id: Option<String>,
    pub is_from_me: bool,
}

/// A persisted message. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_type: SenderType,
    pub sender_name: Option<String>,
    pub message_type: String,
    pub body: String,
    pub media_url: Option<String>,
    pub wa_message_id: Option<String>,
    pub is_from_me: bool,
    pub created_at: String,
}

/// Outcome of a successful provider send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// External message id as reported by the provider, when available.
    pub message_id: Option<String>,
}

/// Result of a registration check.
#[derive(Debug, Clone)]
pub struct RegistrationCheck {
    pub exists: bool,
    /// Canonical JID for the number, when the provider reports one.
    pub jid: Option<String>,
}

/// Reference to a media object, by URL (never raw bytes at this layer).
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub url: String,
    pub mime_type: Option<String>,
}

/// A tenant-configured outbound webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantWebhook {
    pub id: i64,
    pub tenant_id: String,
    pub url: String,
}

/// A user reachable by phone, for alert targeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContact {
    pub id: String,
    pub name: String,
    pub phone_number: String,
}

/// A claimed campaign job, joined with the campaign and tenant it belongs
/// to so the processor can dispatch without further lookups.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: i64,
    pub campaign_id: i64,
    pub phone_number: String,
    pub message_template: String,
    pub campaign_name: String,
    pub tenant: Tenant,
}
