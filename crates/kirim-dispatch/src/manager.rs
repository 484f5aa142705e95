// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle orchestration.
//!
//! Creation authenticates the session with the socket gateway (storing its
//! JWT) and requests a login, surfacing pairing QR material through the
//! registry. Deletion logs out best-effort, closes the outbound queue, and
//! forgets the session. A session has at most one live connection at any
//! moment; the registry's single-flight reconnect keeps it that way.

use std::sync::Arc;

use kirim_core::types::SessionStatus;
use kirim_core::KirimError;
use kirim_provider::SocketGatewayClient;
use tracing::{info, warn};

use crate::registry::{SessionEntry, SessionRegistry};
use crate::scheduler::DispatchScheduler;

/// Creates and destroys socket-driver sessions.
pub struct SessionManager {
    client: Arc<SocketGatewayClient>,
    registry: Arc<SessionRegistry>,
    scheduler: Arc<DispatchScheduler>,
    gateway_password: Option<String>,
}

impl SessionManager {
    pub fn new(
        client: Arc<SocketGatewayClient>,
        registry: Arc<SessionRegistry>,
        scheduler: Arc<DispatchScheduler>,
        gateway_password: Option<String>,
    ) -> Self {
        Self {
            client,
            registry,
            scheduler,
            gateway_password,
        }
    }

    /// Create (or re-activate) a session: authenticate with the gateway,
    /// request a login, and record pairing material.
    ///
    /// Returns the resulting registry entry. The caller shows the QR to
    /// the tenant when one is present.
    pub async fn create_session(&self, session_id: &str) -> Result<SessionEntry, KirimError> {
        let password = self.gateway_password.as_deref().ok_or_else(|| {
            KirimError::Config("socket_gateway.password is required to create sessions".to_string())
        })?;

        self.client.authenticate(session_id, password).await?;
        self.registry
            .update_status(session_id, SessionStatus::Connecting, None, None);

        let outcome = self.client.login(session_id).await?;
        if outcome.qr.is_some() {
            self.registry.update_status(
                session_id,
                SessionStatus::Connecting,
                None,
                outcome.qr,
            );
        } else if outcome.message.to_lowercase().contains("reconnected") {
            self.registry
                .update_status(session_id, SessionStatus::Connected, None, None);
        }

        info!(session = session_id, "session created");
        self.registry
            .entry(session_id)
            .ok_or_else(|| KirimError::Internal("session vanished during creation".to_string()))
    }

    /// Delete a session: best-effort gateway logout, close the outbound
    /// queue, forget registry state and the stored token.
    ///
    /// An in-flight send cannot be recalled; everything still queued fails
    /// with `SessionClosed`.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), KirimError> {
        if let Err(e) = self.client.logout(session_id).await {
            warn!(session = session_id, error = %e, "gateway logout failed, continuing cleanup");
        }

        self.scheduler.close_session(session_id).await;
        self.registry.remove(session_id);
        info!(session = session_id, "session deleted");
        Ok(())
    }
}
