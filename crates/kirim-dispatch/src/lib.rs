// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch for the Kirim gateway.
//!
//! [`DispatchScheduler`] owns one ordered, throttled queue per session and
//! is the only path through which a provider send is invoked for that
//! session. [`SessionRegistry`] is the process-wide session state table
//! with single-flight reconnect scheduling.

pub mod manager;
pub mod registry;
pub mod scheduler;

pub use manager::SessionManager;
pub use registry::{SessionEntry, SessionRegistry};
pub use scheduler::DispatchScheduler;
