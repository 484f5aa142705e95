// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque per-session secret storage.

use async_trait::async_trait;

use crate::error::KirimError;

/// Stores per-session API tokens behind an opaque load/save interface.
///
/// The core only depends on get/set/delete; how tokens are persisted (and
/// whether they are encrypted at rest) is the implementation's concern.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn token_for_session(&self, session_id: &str) -> Result<Option<String>, KirimError>;

    async fn set_token(&self, session_id: &str, token: &str) -> Result<(), KirimError>;

    async fn delete_token(&self, session_id: &str) -> Result<(), KirimError>;
}
