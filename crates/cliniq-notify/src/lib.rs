// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification gateway adapters for the cliniq queue service.
//!
//! The queue core fires [`cliniq_core::NotifierAdapter`] calls on specific
//! transitions; this crate provides the HTTP webhook implementation used in
//! production and an in-memory recorder used in tests and when no relay is
//! configured.

pub mod memory;
pub mod noop;
pub mod webhook;

pub use memory::{MemoryNotifier, SentNotification};
pub use noop::NoopNotifier;
pub use webhook::WebhookNotifier;
