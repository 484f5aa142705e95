// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core trait definitions, error types, and identity normalization for the
//! Kirim WhatsApp gateway.
//!
//! Everything that crosses a crate boundary lives here: the [`KirimError`]
//! taxonomy, the tenant/chat/message domain types, the canonical JID
//! normalizer, and the trait seams ([`WhatsAppProvider`], [`Store`],
//! [`SecretStore`]) the rest of the workspace implements or consumes.

pub mod error;
pub mod jid;
pub mod traits;
pub mod types;

pub use error::KirimError;
pub use traits::provider::WhatsAppProvider;
pub use traits::secret::SecretStore;
pub use traits::store::Store;
