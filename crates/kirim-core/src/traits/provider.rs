// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability interface over the heterogeneous WhatsApp backends.

use async_trait::async_trait;

use crate::error::KirimError;
use crate::types::{DestinationFormat, MediaRef, RegistrationCheck, SendReceipt};

/// A WhatsApp backend capable of sending messages and answering identity
/// queries for one tenant.
///
/// Implementations are resolved per tenant at the point of use (tenant
/// configuration can change between calls) and must never be cached
/// indefinitely.
#[async_trait]
pub trait WhatsAppProvider: Send + Sync {
    /// The destination address format this driver requires.
    fn destination_format(&self) -> DestinationFormat;

    /// Send a text message. `to` must already be in the driver's
    /// [`destination_format`](Self::destination_format).
    async fn send_text(&self, to: &str, body: &str) -> Result<SendReceipt, KirimError>;

    /// Send a media message by reference.
    async fn send_media(
        &self,
        to: &str,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SendReceipt, KirimError>;

    /// Check whether a phone number is registered on WhatsApp.
    async fn check_registered(&self, phone: &str) -> Result<RegistrationCheck, KirimError>;

    /// Fetch the profile picture URL for a JID, if one is visible.
    async fn fetch_profile_picture(&self, jid: &str) -> Result<Option<String>, KirimError>;
}
