// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline reconciler: admits batches of tokens created on disconnected
//! front-desk devices.
//!
//! Batch items are independent -- one bad record never blocks the others --
//! and the whole batch is safe to replay: the client-supplied idempotency
//! marker `(device_id, local_created_at, patient_phone)` short-circuits
//! items that already synced. The server always re-derives token numbers;
//! whatever the device assigned locally is informational only.

use chrono::{DateTime, Utc};
use cliniq_core::types::{BookingType, NotificationType, OfflineSync, Priority, Token};
use cliniq_core::CliniqError;
use cliniq_storage::models::TokenDraft;
use cliniq_storage::queries::tokens;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sequencer;
use crate::service::{validate_patient_fields, validated_prefix, QueueService};

/// One token as uploaded from a disconnected device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineTokenUpload {
    pub clinic_id: String,
    pub doctor_id: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    #[serde(default)]
    pub booking_type: Option<BookingType>,
    #[serde(default)]
    pub token_prefix: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Device-local creation time; part of the idempotency marker.
    pub local_created_at: DateTime<Utc>,
    /// Number the device displayed while offline. Never trusted.
    #[serde(default)]
    pub local_token_number: Option<i64>,
}

/// A batch item that collided with an existing active token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    pub item: OfflineTokenUpload,
    pub existing_token: Token,
    /// Human-readable summary surfaced to reception for manual resolution.
    pub resolution: String,
}

/// A batch item that failed outright (validation or storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncItemError {
    pub item: OfflineTokenUpload,
    pub error: String,
}

/// Result of reconciling one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: Vec<Token>,
    pub conflicts: Vec<SyncConflict>,
    pub errors: Vec<SyncItemError>,
}

enum ItemOutcome {
    Synced(Token),
    Conflict(Token),
}

impl QueueService {
    /// Reconcile a batch of offline-created tokens.
    ///
    /// Items are processed independently; the report partitions them into
    /// `synced`, `conflicts` (existing active token for the same
    /// doctor/day/phone -- left for manual resolution), and `errors`.
    pub async fn sync_offline_batch(
        &self,
        batch: Vec<OfflineTokenUpload>,
        device_id: &str,
    ) -> Result<SyncReport, CliniqError> {
        if device_id.trim().is_empty() {
            return Err(CliniqError::Validation("device_id must not be empty".into()));
        }

        let mut report = SyncReport::default();
        let total = batch.len();
        for item in batch {
            match self.sync_one(&item, device_id).await {
                Ok(ItemOutcome::Synced(token)) => report.synced.push(token),
                Ok(ItemOutcome::Conflict(existing)) => {
                    let resolution = CliniqError::DuplicateActiveToken {
                        display_token: existing.display_token.clone(),
                    }
                    .to_string();
                    report.conflicts.push(SyncConflict {
                        item,
                        existing_token: existing,
                        resolution,
                    });
                }
                Err(e) => {
                    warn!(error = %e, phone = %item.patient_phone, "offline item failed to sync");
                    report.errors.push(SyncItemError {
                        item,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            device_id,
            total,
            synced = report.synced.len(),
            conflicts = report.conflicts.len(),
            errors = report.errors.len(),
            "offline batch reconciled"
        );
        Ok(report)
    }

    async fn sync_one(
        &self,
        item: &OfflineTokenUpload,
        device_id: &str,
    ) -> Result<ItemOutcome, CliniqError> {
        validate_patient_fields(
            &item.clinic_id,
            &item.doctor_id,
            &item.patient_name,
            &item.patient_phone,
        )?;
        let prefix = match &item.token_prefix {
            Some(p) => validated_prefix(p)?,
            None => self.config.default_prefix.clone(),
        };

        // The token lands on the server's day boundary regardless of when the
        // device created it locally.
        let now = Utc::now();
        let date = now.date_naive();

        // At-least-once delivery: a marker hit means this exact item already
        // synced and its server-side token is the answer.
        if let Some(existing) = tokens::find_by_sync_marker(
            &self.db,
            device_id,
            item.local_created_at,
            &item.patient_phone,
        )
        .await?
        {
            debug!(token = %existing.display_token, "offline item already synced, replay ignored");
            return Ok(ItemOutcome::Synced(existing));
        }

        // Conflict invariant: one active token per (clinic, doctor, day, phone).
        if let Some(existing) = tokens::find_active_for_patient(
            &self.db,
            &item.clinic_id,
            &item.doctor_id,
            date,
            &item.patient_phone,
        )
        .await?
        {
            return Ok(ItemOutcome::Conflict(existing));
        }

        let draft = TokenDraft {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id: item.clinic_id.clone(),
            doctor_id: item.doctor_id.clone(),
            token_date: date,
            token_prefix: prefix,
            patient_id: item.patient_id.clone(),
            patient_name: item.patient_name.clone(),
            patient_phone: item.patient_phone.clone(),
            booking_type: item.booking_type.unwrap_or(BookingType::WalkIn),
            appointment_id: None,
            priority: item.priority.unwrap_or(Priority::Normal),
            issued_at: now,
            notes: item.notes.clone(),
            offline: OfflineSync::reconciled(device_id.to_string(), item.local_created_at, now),
        };

        let token = sequencer::allocate_with_retry(
            &self.db,
            draft,
            self.config.allocation_max_retries,
            self.config.allocation_backoff_ms,
        )
        .await?;

        self.recalculate_for(&token).await?;
        let token = self.refetch(&token.id).await?;
        self.send_notification(&token, NotificationType::TokenIssued).await;

        Ok(ItemOutcome::Synced(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_deserializes_with_minimal_fields() {
        let item: OfflineTokenUpload = serde_json::from_str(
            r#"{
                "clinic_id": "clinic-1",
                "doctor_id": "doc-1",
                "patient_name": "Ravi Shah",
                "patient_phone": "9990002222",
                "local_created_at": "2026-08-08T08:40:00Z"
            }"#,
        )
        .unwrap();
        assert!(item.local_token_number.is_none());
        assert!(item.token_prefix.is_none());
    }

    #[test]
    fn report_serializes_empty_sections() {
        let report = SyncReport::default();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"synced\":[]"));
        assert!(json.contains("\"conflicts\":[]"));
        assert!(json.contains("\"errors\":[]"));
    }
}
