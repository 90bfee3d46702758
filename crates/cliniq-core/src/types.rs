// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for queue tokens.
//!
//! All string-ish enums are closed `strum` variants. The wire and storage
//! representation is snake_case (`in_consultation`, `walk_in`, ...), matching
//! what clients and the waiting-room display consume.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a queue token. See [`crate::lifecycle`] for the legal
/// transitions between states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Waiting,
    Called,
    InConsultation,
    Completed,
    NoShow,
    Cancelled,
    Skipped,
}

impl TokenStatus {
    /// Terminal states are retained for analytics and same-day duplicate
    /// detection but can never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TokenStatus::Completed | TokenStatus::Cancelled | TokenStatus::NoShow
        )
    }
}

/// Ordering tier for the waiting set. Emergencies jump the queue; recalled
/// skipped patients sit between emergencies and normal arrivals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    Priority,
    Emergency,
}

impl Priority {
    /// Numeric rank used for ordering: higher is served first.
    pub fn rank(self) -> i64 {
        match self {
            Priority::Normal => 0,
            Priority::Priority => 1,
            Priority::Emergency => 2,
        }
    }
}

/// How the visit was booked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    WalkIn,
    OnlineBooking,
    PhoneBooking,
}

/// Reconciliation state of an offline-origin token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Conflict,
    Resolved,
}

/// Outreach event types recorded in the notification log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TokenIssued,
    YourTurnSoon,
    YourTurnNow,
    Skipped,
    Cancelled,
}

/// Delivery outcome of a notification attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

/// Delivery channel for a notification attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Sms,
    Whatsapp,
    App,
}

/// Reception/doctor actions driving the token state machine.
///
/// `CallNext` is not an action on a specific token -- it selects the next
/// eligible waiting token -- so it is a separate operation, not a variant here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    Start,
    Complete,
    NoShow,
    Skip,
    Recall,
    Cancel,
}

/// Offline provenance of a token: where it was first created and how its
/// reconciliation with the server went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineSync {
    pub created_offline: bool,
    pub device_id: Option<String>,
    pub local_created_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub conflict_details: Option<String>,
}

impl OfflineSync {
    /// Provenance for a token created directly on the server.
    pub fn online(now: DateTime<Utc>) -> Self {
        Self {
            created_offline: false,
            device_id: None,
            local_created_at: None,
            synced_at: Some(now),
            sync_status: SyncStatus::Synced,
            conflict_details: None,
        }
    }

    /// Provenance for a token admitted through the offline reconciler.
    pub fn reconciled(
        device_id: String,
        local_created_at: DateTime<Utc>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            created_offline: true,
            device_id: Some(device_id),
            local_created_at: Some(local_created_at),
            synced_at: Some(synced_at),
            sync_status: SyncStatus::Synced,
            conflict_details: None,
        }
    }
}

/// A single patient's place in a doctor's daily queue.
///
/// `(clinic_id, doctor_id, token_date, token_prefix, token_number)` is the
/// unique allocation key. `queue_position` and `estimated_wait_minutes` are
/// derived and only meaningful while `status == Waiting`; `token_date` is
/// fixed at creation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub clinic_id: String,
    pub doctor_id: String,
    pub token_date: NaiveDate,
    pub token_prefix: String,
    pub token_number: i64,
    pub display_token: String,

    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,

    pub booking_type: BookingType,
    pub appointment_id: Option<String>,

    pub status: TokenStatus,
    pub priority: Priority,
    pub queue_position: Option<i64>,
    pub estimated_wait_minutes: Option<i64>,

    pub issued_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub consultation_started_at: Option<DateTime<Utc>>,
    pub consultation_ended_at: Option<DateTime<Utc>>,
    pub consultation_minutes: Option<i64>,

    pub notes: Option<String>,
    pub offline: OfflineSync,
}

/// Derive the human-readable display token, e.g. `A-014`.
pub fn format_display_token(prefix: &str, number: i64) -> String {
    format!("{prefix}-{number:03}")
}

/// Payload handed to the notification gateway alongside the event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyPayload {
    pub display_token: String,
    pub patient_name: String,
    pub queue_position: Option<i64>,
    pub estimated_wait_minutes: Option<i64>,
}

impl NotifyPayload {
    /// Build a payload from a token's current derived fields.
    pub fn from_token(token: &Token) -> Self {
        Self {
            display_token: token.display_token.clone(),
            patient_name: token.patient_name.clone(),
            queue_position: token.queue_position,
            estimated_wait_minutes: token.estimated_wait_minutes,
        }
    }
}
