// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Socket-gateway driver: proxies the self-hosted device-emulation gateway
//! over per-session HTTP.
//!
//! The gateway wraps every response in a `{status, message, data}` envelope;
//! the external message id sits nested at `data.id`. Requests authenticate
//! with the session's JWT from the [`SecretStore`]; on a 401/500 the client
//! re-authenticates once with the shared gateway password and retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kirim_config::model::SocketGatewayConfig;
use kirim_core::types::{DestinationFormat, MediaRef, RegistrationCheck, SendReceipt};
use kirim_core::{KirimError, SecretStore, WhatsAppProvider};
use serde::Deserialize;
use tracing::{debug, warn};

/// Response envelope used by every gateway endpoint.
#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    #[serde(default)]
    status: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl GatewayEnvelope {
    /// The gateway reports status as `true` or `"success"` depending on the
    /// endpoint.
    fn is_ok(&self) -> bool {
        self.status == serde_json::Value::Bool(true)
            || self.status.as_str() == Some("success")
    }

    fn message(&self) -> String {
        self.message.clone().unwrap_or_else(|| "unknown gateway error".to_string())
    }

    fn data_str(&self, key: &str) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

/// Outcome of a gateway login call.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Pairing QR payload when the session needs a scan.
    pub qr: Option<String>,
    /// Raw gateway message ("Reconnected", etc.).
    pub message: String,
}

/// HTTP client for the legacy per-session gateway API.
///
/// One instance serves all sessions; the per-session JWT is looked up from
/// the [`SecretStore`] on every request so token rotation needs no cache
/// invalidation.
pub struct SocketGatewayClient {
    http: reqwest::Client,
    base_url: String,
    password: Option<String>,
    secrets: Arc<dyn SecretStore>,
}

impl SocketGatewayClient {
    pub fn new(
        config: &SocketGatewayConfig,
        secrets: Arc<dyn SecretStore>,
    ) -> Result<Self, KirimError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KirimError::provider("failed to build gateway HTTP client", e))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            password: config.password.clone(),
            secrets,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }

    async fn bearer(&self, session_id: &str) -> Result<String, KirimError> {
        let token = self
            .secrets
            .token_for_session(session_id)
            .await?
            .ok_or_else(|| KirimError::Provider {
                message: format!("no gateway token for session {session_id}"),
                source: None,
            })?;
        Ok(format!("Bearer {token}"))
    }

    /// Authenticate a session with the gateway's shared password and store
    /// the returned JWT.
    pub async fn authenticate(&self, session_id: &str, password: &str) -> Result<(), KirimError> {
        let response = self
            .http
            .get(self.url("/auth"))
            .basic_auth(session_id, Some(password))
            .send()
            .await
            .map_err(|e| KirimError::provider("gateway authentication request failed", e))?;
        let envelope: GatewayEnvelope = response
            .json()
            .await
            .map_err(|e| KirimError::provider("invalid gateway authentication response", e))?;

        let token = envelope.data_str("token").ok_or_else(|| KirimError::Provider {
            message: format!("gateway authentication failed: {}", envelope.message()),
            source: None,
        })?;
        self.secrets.set_token(session_id, &token).await?;
        debug!(session = session_id, "gateway session authenticated");
        Ok(())
    }

    /// Request a login (QR pairing) for a session. Calling this on an
    /// already-active session makes the gateway reconnect it.
    pub async fn login(&self, session_id: &str) -> Result<LoginOutcome, KirimError> {
        let envelope = self
            .post_form(session_id, "/login", &[("output", "json")])
            .await?;
        Ok(LoginOutcome {
            qr: envelope.data_str("qrcode").or_else(|| envelope.data_str("qr")),
            message: envelope.message(),
        })
    }

    /// Log a session out of WhatsApp and drop its stored token.
    pub async fn logout(&self, session_id: &str) -> Result<(), KirimError> {
        // Best effort: the token must go even when the gateway call fails.
        let result = self.post_form(session_id, "/logout", &[]).await;
        self.secrets.delete_token(session_id).await?;
        result.map(|_| ())
    }

    pub async fn send_text(
        &self,
        session_id: &str,
        to: &str,
        body: &str,
    ) -> Result<SendReceipt, KirimError> {
        let envelope = self
            .post_form_with_recovery(session_id, "/send/text", &[("msisdn", to), ("message", body)])
            .await?;
        Ok(SendReceipt {
            message_id: envelope.data_str("id"),
        })
    }

    /// Send an image by URL: the gateway only accepts raw uploads, so the
    /// media is fetched and relayed as multipart form data.
    pub async fn send_image_url(
        &self,
        session_id: &str,
        to: &str,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SendReceipt, KirimError> {
        let bytes = self
            .http
            .get(&media.url)
            .send()
            .await
            .map_err(|e| KirimError::provider("failed to fetch media source", e))?
            .bytes()
            .await
            .map_err(|e| KirimError::provider("failed to read media source", e))?;

        let mut part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("image");
        if let Some(mime) = &media.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| KirimError::provider("invalid media mime type", e))?;
        }
        let mut form = reqwest::multipart::Form::new()
            .text("msisdn", to.to_string())
            .part("image", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let auth = self.bearer(session_id).await?;
        let response = self
            .http
            .post(self.url("/send/image"))
            .header(reqwest::header::AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| KirimError::provider("gateway send image failed", e))?;
        let envelope = Self::read_envelope(response).await?;
        Ok(SendReceipt {
            message_id: envelope.data_str("id"),
        })
    }

    pub async fn check_registered(
        &self,
        session_id: &str,
        phone: &str,
    ) -> Result<RegistrationCheck, KirimError> {
        let auth = self.bearer(session_id).await?;
        let response = self
            .http
            .get(self.url("/registered"))
            .header(reqwest::header::AUTHORIZATION, auth)
            .query(&[("msisdn", phone)])
            .send()
            .await
            .map_err(|e| KirimError::provider("gateway registration check failed", e))?;

        // The gateway answers 4xx for unregistered numbers; that is a
        // negative result, not a failure.
        if response.status().is_client_error() {
            return Ok(RegistrationCheck {
                exists: false,
                jid: None,
            });
        }
        let envelope = Self::read_envelope(response).await?;
        Ok(RegistrationCheck {
            exists: envelope.data_str("status").as_deref() == Some("valid"),
            jid: envelope.data_str("jid"),
        })
    }

    async fn post_form(
        &self,
        session_id: &str,
        route: &str,
        fields: &[(&str, &str)],
    ) -> Result<GatewayEnvelope, KirimError> {
        let auth = self.bearer(session_id).await?;
        let response = self
            .http
            .post(self.url(route))
            .header(reqwest::header::AUTHORIZATION, auth)
            .form(fields)
            .send()
            .await
            .map_err(|e| KirimError::provider(format!("gateway {route} request failed"), e))?;
        Self::read_envelope(response).await
    }

    /// Post a form; on 401/500, re-authenticate once with the shared
    /// password and retry. The gateway answers those statuses when a
    /// session's JWT expired or its client went away.
    async fn post_form_with_recovery(
        &self,
        session_id: &str,
        route: &str,
        fields: &[(&str, &str)],
    ) -> Result<GatewayEnvelope, KirimError> {
        match self.post_form(session_id, route, fields).await {
            Ok(envelope) => Ok(envelope),
            Err(first_err) => {
                let Some(password) = &self.password else {
                    return Err(first_err);
                };
                if !matches!(&first_err, KirimError::Provider { message, .. }
                    if message.contains("401") || message.contains("500"))
                {
                    return Err(first_err);
                }
                warn!(session = session_id, route, "gateway rejected request, re-authenticating");
                self.authenticate(session_id, password).await?;
                // One login nudge so the gateway reconnects the client.
                if let Err(e) = self.login(session_id).await {
                    warn!(session = session_id, error = %e, "reconnect login failed");
                }
                self.post_form(session_id, route, fields).await
            }
        }
    }

    async fn read_envelope(response: reqwest::Response) -> Result<GatewayEnvelope, KirimError> {
        let status = response.status();
        let envelope: GatewayEnvelope = response.json().await.map_err(|e| {
            KirimError::provider(format!("invalid gateway response (HTTP {status})"), e)
        })?;
        if !status.is_success() || !envelope.is_ok() {
            return Err(KirimError::Provider {
                message: format!("gateway error (HTTP {status}): {}", envelope.message()),
                source: None,
            });
        }
        Ok(envelope)
    }
}

/// `WhatsAppProvider` over one tenant's socket session.
///
/// Destinations must already be canonical JIDs.
pub struct SocketDriver {
    session_id: String,
    client: Arc<SocketGatewayClient>,
}

impl SocketDriver {
    pub fn new(session_id: String, client: Arc<SocketGatewayClient>) -> Self {
        Self { session_id, client }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl WhatsAppProvider for SocketDriver {
    fn destination_format(&self) -> DestinationFormat {
        DestinationFormat::CanonicalJid
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<SendReceipt, KirimError> {
        self.client.send_text(&self.session_id, to, body).await
    }

    async fn send_media(
        &self,
        to: &str,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SendReceipt, KirimError> {
        self.client
            .send_image_url(&self.session_id, to, media, caption)
            .await
    }

    async fn check_registered(&self, phone: &str) -> Result<RegistrationCheck, KirimError> {
        self.client.check_registered(&self.session_id, phone).await
    }

    /// The legacy gateway does not expose avatar fetching.
    async fn fetch_profile_picture(&self, _jid: &str) -> Result<Option<String>, KirimError> {
        Ok(None)
    }
}
