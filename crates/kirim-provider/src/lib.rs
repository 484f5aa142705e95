// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp provider abstraction for the Kirim gateway.
//!
//! Two interchangeable drivers implement the `WhatsAppProvider` capability
//! interface from `kirim-core`:
//!
//! - [`SocketDriver`] proxies the self-hosted device-emulation gateway over
//!   per-session HTTP, authenticating each request with the session's JWT.
//! - [`CloudDriver`] speaks the hosted Graph-style cloud API with a
//!   phone-number id and access token.
//!
//! [`ProviderFactory`] selects the driver per tenant and fails fast with a
//! configuration error when the tenant's credentials are incomplete.

pub mod cloud;
pub mod factory;
pub mod socket;

pub use cloud::CloudDriver;
pub use factory::{ProviderFactory, ProviderResolver};
pub use socket::{SocketDriver, SocketGatewayClient};
