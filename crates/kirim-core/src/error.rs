// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kirim gateway.

use thiserror::Error;

/// The primary error type used across all Kirim trait boundaries and core
/// operations.
#[derive(Debug, Error)]
pub enum KirimError {
    /// Configuration errors (missing provider credentials, invalid TOML,
    /// type mismatches). Fatal for the affected tenant's sends; never
    /// retried automatically.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed destination or address, rejected before any provider
    /// contact is made.
    #[error("validation error: {0}")]
    Validation(String),

    /// Provider wire failures (gateway HTTP errors, cloud API rejections,
    /// network timeouts).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure,
    /// serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The session's outbound queue was closed before the job ran.
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KirimError {
    /// Wrap a provider transport failure with context.
    pub fn provider(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
