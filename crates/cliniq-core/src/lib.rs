// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the cliniq queue token service.
//!
//! This crate provides the domain types, error taxonomy, the pure queue
//! token state machine, and the trait boundary to the notification gateway.
//! Storage and transport live in sibling crates.

pub mod error;
pub mod lifecycle;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CliniqError;
pub use traits::NotifierAdapter;
pub use types::{
    BookingType, NotificationChannel, NotificationStatus, NotificationType, NotifyPayload,
    OfflineSync, Priority, SyncStatus, Token, TokenAction, TokenStatus,
};
