// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily queue statistics for a clinic.

use chrono::NaiveDate;
use cliniq_core::types::{Token, TokenStatus};
use cliniq_core::CliniqError;
use cliniq_storage::queries::tokens;
use serde::{Deserialize, Serialize};

use crate::service::QueueService;

/// Aggregate counts and averages over one clinic day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub waiting: usize,
    pub in_consultation: usize,
    pub completed: usize,
    pub no_show: usize,
    pub cancelled: usize,
    /// Mean of recorded consultation durations, whole minutes. 0 when no
    /// consultations have completed yet.
    pub avg_consultation_minutes: i64,
    /// Mean issued-to-consultation-start wait, whole minutes. 0 when nothing
    /// has started yet.
    pub avg_wait_minutes: i64,
}

impl QueueService {
    /// Statistics for a clinic day. `date` defaults to today.
    pub async fn get_stats(
        &self,
        clinic_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<QueueStats, CliniqError> {
        let date = date.unwrap_or_else(|| chrono::Utc::now().date_naive());
        let day = tokens::tokens_for_day(&self.db, clinic_id, date).await?;
        Ok(compute_stats(&day))
    }
}

/// Fold one day's tokens into aggregate stats. Pure.
pub fn compute_stats(day: &[Token]) -> QueueStats {
    let mut stats = QueueStats {
        total: day.len(),
        ..QueueStats::default()
    };
    for token in day {
        match token.status {
            TokenStatus::Waiting => stats.waiting += 1,
            TokenStatus::InConsultation => stats.in_consultation += 1,
            TokenStatus::Completed => stats.completed += 1,
            TokenStatus::NoShow => stats.no_show += 1,
            TokenStatus::Cancelled => stats.cancelled += 1,
            TokenStatus::Called | TokenStatus::Skipped => {}
        }
    }
    stats.avg_consultation_minutes = rounded_mean(
        day.iter().filter_map(|t| t.consultation_minutes),
    );
    stats.avg_wait_minutes = rounded_mean(day.iter().filter_map(|t| {
        t.consultation_started_at
            .map(|started| (started - t.issued_at).num_minutes())
    }));
    stats
}

fn rounded_mean(values: impl Iterator<Item = i64>) -> i64 {
    let (sum, count) = values.fold((0i64, 0i64), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0
    } else {
        (sum as f64 / count as f64).round() as i64
    }
}
