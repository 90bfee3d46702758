// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage entity types.
//!
//! The canonical domain types live in `cliniq-core::types` and are
//! re-exported here for convenience within the storage crate. This module
//! adds the shapes that only exist at the persistence boundary: the
//! pre-allocation token draft and the notification log row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use cliniq_core::types::{
    BookingType, NotificationChannel, NotificationStatus, NotificationType, OfflineSync, Priority,
    SyncStatus, Token, TokenStatus,
};

/// A token before the sequencer has assigned its number.
///
/// Everything the caller decides is here; `token_number`, `display_token`,
/// and the derived position fields are filled in by `allocate_and_insert`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDraft {
    pub id: String,
    pub clinic_id: String,
    pub doctor_id: String,
    pub token_date: NaiveDate,
    pub token_prefix: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    pub booking_type: BookingType,
    pub appointment_id: Option<String>,
    pub priority: Priority,
    pub issued_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub offline: OfflineSync,
}

impl TokenDraft {
    /// Human-readable allocation key, used in conflict errors and logs.
    pub fn allocation_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.clinic_id, self.doctor_id, self.token_date, self.token_prefix
        )
    }
}

/// One row of the append-only notification log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEntry {
    pub id: i64,
    pub token_id: String,
    pub kind: NotificationType,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub sent_at: DateTime<Utc>,
}
