// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic "your turn soon" sweep.
//!
//! Polls the waiting tokens in the top N positions of every doctor queue and
//! notifies each patient at most once per notification type per window. The
//! idempotency key is `(token_id, kind, window)` checked against the shared
//! notification log, so the sweep is retry-safe and can run from multiple
//! instances without duplicate sends.

use chrono::{NaiveDate, Utc};
use cliniq_core::types::NotificationType;
use cliniq_core::CliniqError;
use cliniq_storage::queries::{notifications, tokens};
use tracing::{debug, info};

use crate::service::QueueService;

impl QueueService {
    /// One sweep pass over every doctor queue with waiting patients today.
    /// Returns the number of notifications attempted.
    pub async fn run_notification_sweep(&self) -> Result<usize, CliniqError> {
        let date = Utc::now().date_naive();
        let keys = tokens::waiting_doctor_keys(&self.db, date).await?;
        let mut attempted = 0;
        for (clinic_id, doctor_id) in keys {
            attempted += self.notify_upcoming(&clinic_id, &doctor_id, date).await?;
        }
        if attempted > 0 {
            info!(attempted, "notification sweep sent turn-soon alerts");
        } else {
            debug!("notification sweep: nothing to send");
        }
        Ok(attempted)
    }

    /// Notify waiting patients within the top configured positions for one
    /// doctor/day, skipping anyone alerted within the window.
    pub async fn notify_upcoming(
        &self,
        clinic_id: &str,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<usize, CliniqError> {
        let waiting = tokens::waiting_set(&self.db, clinic_id, doctor_id, date).await?;
        let mut attempted = 0;
        for token in waiting.iter().filter(|t| {
            t.queue_position
                .is_some_and(|p| p <= self.config.notify_ahead_positions)
        }) {
            let already = notifications::was_sent_within(
                &self.db,
                &token.id,
                NotificationType::YourTurnSoon,
                self.config.notify_window_minutes,
                Utc::now(),
            )
            .await?;
            if already {
                continue;
            }
            self.send_notification(token, NotificationType::YourTurnSoon)
                .await;
            attempted += 1;
        }
        Ok(attempted)
    }
}
