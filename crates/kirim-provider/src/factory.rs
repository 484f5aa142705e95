// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant provider selection.
//!
//! Resolution happens at the point of use and is never cached: tenant
//! configuration can change between calls, and a stale driver would keep
//! sending through a deselected backend.

use std::sync::Arc;

use kirim_config::model::CloudApiConfig;
use kirim_core::types::Tenant;
use kirim_core::{KirimError, WhatsAppProvider};

use crate::cloud::CloudDriver;
use crate::socket::{SocketDriver, SocketGatewayClient};

/// Resolves a tenant to its configured provider driver.
///
/// A seam for the campaign processor and message routes; tests substitute
/// a recording implementation.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, tenant: &Tenant) -> Result<Box<dyn WhatsAppProvider>, KirimError>;
}

/// Builds drivers from tenant configuration.
pub struct ProviderFactory {
    socket_client: Arc<SocketGatewayClient>,
    cloud_config: CloudApiConfig,
}

impl ProviderFactory {
    pub fn new(socket_client: Arc<SocketGatewayClient>, cloud_config: CloudApiConfig) -> Self {
        Self {
            socket_client,
            cloud_config,
        }
    }

    /// Get the provider for a tenant.
    ///
    /// Fails fast with `KirimError::Config` when the credentials the
    /// selected variant needs are absent; no network is touched in that
    /// path, so callers can alert the tenant instead of silently falling
    /// back.
    pub fn get(&self, tenant: &Tenant) -> Result<Box<dyn WhatsAppProvider>, KirimError> {
        match tenant.provider {
            kirim_core::types::ProviderKind::Cloud => {
                let (phone_id, token) = match (&tenant.cloud_phone_id, &tenant.cloud_token) {
                    (Some(phone_id), Some(token)) => (phone_id, token),
                    _ => {
                        return Err(KirimError::Config(format!(
                            "tenant {} is missing cloud API credentials",
                            tenant.company_name
                        )));
                    }
                };
                let driver = CloudDriver::new(
                    &self.cloud_config.base_url,
                    &self.cloud_config.api_version,
                    phone_id,
                    token,
                )?;
                Ok(Box::new(driver))
            }
            kirim_core::types::ProviderKind::Socket => {
                let session_id = tenant.session_id.as_ref().ok_or_else(|| {
                    KirimError::Config(format!(
                        "tenant {} has no WhatsApp session id",
                        tenant.company_name
                    ))
                })?;
                Ok(Box::new(SocketDriver::new(
                    session_id.clone(),
                    Arc::clone(&self.socket_client),
                )))
            }
        }
    }
}

impl ProviderResolver for ProviderFactory {
    fn resolve(&self, tenant: &Tenant) -> Result<Box<dyn WhatsAppProvider>, KirimError> {
        self.get(tenant)
    }
}
