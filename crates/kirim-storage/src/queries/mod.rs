// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query operations, one module per entity group.

pub mod campaigns;
pub mod chats;
pub mod directory;
pub mod messages;
pub mod secrets;
pub mod tenants;
