// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue service: orchestrates the sequencer, the token state machine,
//! position recalculation, and outbound notifications over one storage
//! handle.
//!
//! Every mutating operation follows the same shape: validate, mutate through
//! a compare-and-swap persist, recalculate the waiting set if it changed,
//! then fire best-effort notifications. Notification failure never rolls
//! back a transition.

use std::sync::Arc;

use chrono::Utc;
use cliniq_config::model::QueueConfig;
use cliniq_core::lifecycle;
use cliniq_core::types::{
    BookingType, NotificationStatus, NotificationType, NotifyPayload, OfflineSync, Priority, Token,
    TokenAction, TokenStatus,
};
use cliniq_core::{CliniqError, NotifierAdapter};
use cliniq_storage::models::TokenDraft;
use cliniq_storage::queries::{notifications, tokens};
use cliniq_storage::Database;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{recalc, sequencer};

/// Bound on re-selection after losing the `waiting -> called` status race.
const MAX_CALL_NEXT_ATTEMPTS: usize = 3;

/// Online token creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    pub clinic_id: String,
    pub doctor_id: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    #[serde(default)]
    pub booking_type: Option<BookingType>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub token_prefix: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Front door to the queue core. Cheap to clone behind an `Arc` in the
/// gateway; all clones share the storage handle and notifier.
pub struct QueueService {
    pub(crate) db: Database,
    pub(crate) notifier: Arc<dyn NotifierAdapter>,
    pub(crate) config: QueueConfig,
}

impl QueueService {
    pub fn new(db: Database, notifier: Arc<dyn NotifierAdapter>, config: QueueConfig) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Queue configuration in effect.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Storage handle, for operational tooling.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Issue a new token for the online path.
    ///
    /// Allocation and insert are atomic; positions are recomputed before the
    /// token is returned so the caller sees its place in the queue.
    pub async fn create_token(&self, req: CreateTokenRequest) -> Result<Token, CliniqError> {
        validate_patient_fields(&req.clinic_id, &req.doctor_id, &req.patient_name, &req.patient_phone)?;
        let prefix = match &req.token_prefix {
            Some(p) => validated_prefix(p)?,
            None => self.config.default_prefix.clone(),
        };

        let now = Utc::now();
        let draft = TokenDraft {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id: req.clinic_id,
            doctor_id: req.doctor_id,
            token_date: now.date_naive(),
            token_prefix: prefix,
            patient_id: req.patient_id,
            patient_name: req.patient_name,
            patient_phone: req.patient_phone,
            booking_type: req.booking_type.unwrap_or(BookingType::WalkIn),
            appointment_id: req.appointment_id,
            priority: req.priority.unwrap_or(Priority::Normal),
            issued_at: now,
            notes: req.notes,
            offline: OfflineSync::online(now),
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

        info!(
            token = %token.display_token,
            clinic = %token.clinic_id,
            doctor = %token.doctor_id,
            position = token.queue_position,
            "token issued"
        );
        Ok(token)
    }

    /// Call the next eligible waiting patient for a doctor.
    ///
    /// Selection honors priority then arrival order. The `waiting -> called`
    /// flip is a compare-and-swap on status, so two concurrent call-next
    /// requests can never call the same token: the loser re-selects.
    pub async fn call_next(
        &self,
        clinic_id: &str,
        doctor_id: &str,
    ) -> Result<Option<Token>, CliniqError> {
        let date = Utc::now().date_naive();
        for _ in 0..MAX_CALL_NEXT_ATTEMPTS {
            let waiting = tokens::waiting_set(&self.db, clinic_id, doctor_id, date).await?;
            let Some(mut candidate) = waiting.into_iter().next() else {
                return Ok(None);
            };
            let outcome = lifecycle::mark_called(&mut candidate, Utc::now())?;
            if tokens::persist_transition(&self.db, &candidate, TokenStatus::Waiting).await? {
                self.recalculate_for(&candidate).await?;
                if let Some(event) = outcome.notification {
                    self.send_notification(&candidate, event).await;
                }
                info!(token = %candidate.display_token, doctor = doctor_id, "patient called");
                return Ok(Some(candidate));
            }
            // Lost the race to a concurrent call-next; select again.
        }
        Err(CliniqError::Internal(format!(
            "call-next kept losing the status race for {clinic_id}/{doctor_id}"
        )))
    }

    /// Apply a reception/doctor action to a token.
    ///
    /// Illegal actions are rejected with the token's current state attached.
    /// The persist is CAS-guarded, so a concurrent transition surfaces as
    /// `InvalidTransition` against the fresher state rather than a lost write.
    pub async fn transition(
        &self,
        token_id: &str,
        action: TokenAction,
    ) -> Result<Token, CliniqError> {
        let Some(mut token) = tokens::get_token(&self.db, token_id).await? else {
            return Err(CliniqError::NotFound(token_id.to_string()));
        };

        let from = token.status;
        let outcome = lifecycle::apply_action(&mut token, action, Utc::now())?;

        if !tokens::persist_transition(&self.db, &token, from).await? {
            let current = self.refetch(token_id).await?;
            return Err(CliniqError::InvalidTransition {
                from: current.status,
                action,
            });
        }

        if outcome.waiting_set_changed {
            self.recalculate_for(&token).await?;
        }
        if let Some(event) = outcome.notification {
            self.send_notification(&token, event).await;
        }

        info!(
            token = %token.display_token,
            from = %outcome.from,
            to = %outcome.to,
            "token transitioned"
        );
        // Return the stored row so re-entries carry their fresh position.
        self.refetch(token_id).await
    }

    /// A patient's active (non-terminal) tokens for today, looked up by phone.
    pub async fn tokens_by_phone(&self, phone: &str) -> Result<Vec<Token>, CliniqError> {
        if phone.trim().is_empty() {
            return Err(CliniqError::Validation("phone must not be empty".into()));
        }
        tokens::active_by_phone(&self.db, phone, Utc::now().date_naive()).await
    }

    /// Recompute positions for the token's doctor/day.
    pub(crate) async fn recalculate_for(&self, token: &Token) -> Result<(), CliniqError> {
        recalc::recalculate(
            &self.db,
            &token.clinic_id,
            &token.doctor_id,
            token.token_date,
            self.config.average_consultation_minutes,
        )
        .await?;
        Ok(())
    }

    /// Deliver one notification and append the attempt to the log.
    ///
    /// Failures are recorded and logged, never propagated: the transition
    /// that triggered the send has already been persisted.
    pub(crate) async fn send_notification(&self, token: &Token, event: NotificationType) {
        let payload = NotifyPayload::from_token(token);
        let status = match self
            .notifier
            .notify(&token.patient_phone, event, &payload)
            .await
        {
            Ok(()) => NotificationStatus::Sent,
            Err(e) => {
                warn!(
                    error = %e,
                    token = %token.display_token,
                    %event,
                    "notification send failed"
                );
                NotificationStatus::Failed
            }
        };
        if let Err(e) = notifications::append(
            &self.db,
            &token.id,
            event,
            self.notifier.channel(),
            status,
            Utc::now(),
        )
        .await
        {
            warn!(error = %e, token = %token.id, "failed to append notification log entry");
        }
    }

    pub(crate) async fn refetch(&self, token_id: &str) -> Result<Token, CliniqError> {
        tokens::get_token(&self.db, token_id)
            .await?
            .ok_or_else(|| CliniqError::NotFound(token_id.to_string()))
    }
}

pub(crate) fn validate_patient_fields(
    clinic_id: &str,
    doctor_id: &str,
    patient_name: &str,
    patient_phone: &str,
) -> Result<(), CliniqError> {
    if clinic_id.trim().is_empty() {
        return Err(CliniqError::Validation("clinic_id must not be empty".into()));
    }
    if doctor_id.trim().is_empty() {
        return Err(CliniqError::Validation("doctor_id must not be empty".into()));
    }
    if patient_name.trim().is_empty() {
        return Err(CliniqError::Validation("patient_name must not be empty".into()));
    }
    if patient_phone.trim().is_empty() {
        return Err(CliniqError::Validation("patient_phone must not be empty".into()));
    }
    Ok(())
}

pub(crate) fn validated_prefix(prefix: &str) -> Result<String, CliniqError> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CliniqError::Validation(format!(
            "token_prefix must be non-empty alphanumeric, got `{prefix}`"
        )));
    }
    Ok(trimmed.to_string())
}
