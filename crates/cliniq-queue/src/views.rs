// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue read model: pure projections over current-day token state.
//!
//! Two shapes: the per-doctor queue consumed by reception and the patient
//! app, and the per-clinic display feed for unauthenticated waiting-room
//! screens. Neither ever mutates data.

use chrono::{DateTime, Utc};
use cliniq_core::types::{Token, TokenStatus};
use cliniq_core::CliniqError;
use cliniq_storage::queries::tokens;
use serde::{Deserialize, Serialize};

use crate::service::QueueService;

/// Per-doctor queue view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorQueueView {
    /// The token currently being served: `in_consultation` if one exists,
    /// else the `called` token, else none.
    pub current_token: Option<Token>,
    /// Waiting tokens in serving order.
    pub waiting_queue: Vec<Token>,
    pub total_waiting: usize,
    /// Wait estimate for a patient joining now.
    pub estimated_wait_minutes: i64,
}

/// One doctor's entry in the clinic display feed. Display strings only --
/// the feed is served to unauthenticated screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDisplay {
    pub doctor_id: String,
    pub current_token: Option<String>,
    pub waiting_tokens: Vec<String>,
}

/// Per-clinic waiting-room display feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayFeed {
    pub clinic_id: String,
    pub generated_at: DateTime<Utc>,
    pub queues: Vec<DoctorDisplay>,
}

impl QueueService {
    /// Assemble the current queue for one doctor.
    pub async fn get_queue(
        &self,
        clinic_id: &str,
        doctor_id: &str,
    ) -> Result<DoctorQueueView, CliniqError> {
        let date = Utc::now().date_naive();
        let active = tokens::active_set(&self.db, clinic_id, doctor_id, date).await?;
        Ok(build_doctor_view(
            active,
            self.config.average_consultation_minutes,
        ))
    }

    /// Assemble the clinic-wide display feed, one entry per doctor with
    /// active tokens.
    pub async fn get_display_feed(&self, clinic_id: &str) -> Result<DisplayFeed, CliniqError> {
        let now = Utc::now();
        let active = tokens::clinic_active_set(&self.db, clinic_id, now.date_naive()).await?;
        Ok(DisplayFeed {
            clinic_id: clinic_id.to_string(),
            generated_at: now,
            queues: build_display_queues(active),
        })
    }
}

fn build_doctor_view(active: Vec<Token>, minutes_per_patient: i64) -> DoctorQueueView {
    let current_token = active
        .iter()
        .find(|t| t.status == TokenStatus::InConsultation)
        .or_else(|| active.iter().find(|t| t.status == TokenStatus::Called))
        .cloned();
    let waiting_queue: Vec<Token> = active
        .into_iter()
        .filter(|t| t.status == TokenStatus::Waiting)
        .collect();
    let total_waiting = waiting_queue.len();
    DoctorQueueView {
        current_token,
        waiting_queue,
        total_waiting,
        estimated_wait_minutes: total_waiting as i64 * minutes_per_patient,
    }
}

/// Group a clinic's active tokens by doctor. Input arrives ordered by
/// doctor, priority, then number, so each group's waiting list is already in
/// serving order.
fn build_display_queues(active: Vec<Token>) -> Vec<DoctorDisplay> {
    let mut queues: Vec<DoctorDisplay> = Vec::new();
    for token in active {
        if queues.last().map(|q| q.doctor_id.as_str()) != Some(token.doctor_id.as_str()) {
            queues.push(DoctorDisplay {
                doctor_id: token.doctor_id.clone(),
                current_token: None,
                waiting_tokens: Vec::new(),
            });
        }
        let entry = queues.last_mut().expect("just pushed");
        match token.status {
            TokenStatus::InConsultation => entry.current_token = Some(token.display_token),
            TokenStatus::Called => {
                // A called token is "current" only until someone is actually
                // in consultation.
                if entry.current_token.is_none() {
                    entry.current_token = Some(token.display_token);
                }
            }
            _ => entry.waiting_tokens.push(token.display_token),
        }
    }
    queues
}
