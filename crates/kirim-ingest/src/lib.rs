// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion pipeline for the Kirim gateway.
//!
//! Inbound provider events (socket-gateway webhooks and cloud API
//! callbacks) are normalized into one chat/contact/message model:
//! identities canonicalized, chats and contacts upserted idempotently,
//! messages persisted append-only, enriched events broadcast on the bus,
//! and tenant webhooks fanned out to concurrently and in isolation.

pub mod classify;
pub mod cloud;
pub mod event;
pub mod forward;
pub mod pipeline;
pub mod routes;

pub use event::WebhookEnvelope;
pub use pipeline::IngestPipeline;
pub use routes::router;
