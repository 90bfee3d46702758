// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue position recalculator.
//!
//! Positions and wait estimates are a pure function of the waiting set and
//! the per-patient rate, so recalculation is idempotent and safe to re-run:
//! concurrent runs converge to the same fixed point without locking.

use chrono::NaiveDate;
use cliniq_core::{CliniqError, Token};
use cliniq_storage::queries::tokens;
use cliniq_storage::Database;
use tracing::debug;

/// One waiting token's derived rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub token_id: String,
    pub position: i64,
    pub estimated_wait_minutes: i64,
}

/// Rank a waiting set: priority tier descending, then token number ascending.
/// Position is the 1-based rank; the wait estimate is `rank * rate`.
///
/// Input order does not matter -- the function sorts internally.
pub fn rank_waiting(waiting: &[Token], minutes_per_patient: i64) -> Vec<PositionUpdate> {
    let mut ordered: Vec<&Token> = waiting.iter().collect();
    ordered.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(a.token_number.cmp(&b.token_number))
    });
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, token)| {
            let position = (i + 1) as i64;
            PositionUpdate {
                token_id: token.id.clone(),
                position,
                estimated_wait_minutes: position * minutes_per_patient,
            }
        })
        .collect()
}

/// Recompute and persist positions for a doctor/day's waiting set.
///
/// Returns the number of tokens stamped. Tokens that left `waiting` between
/// the snapshot and the write are skipped by the storage-side guard.
pub async fn recalculate(
    db: &Database,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    minutes_per_patient: i64,
) -> Result<usize, CliniqError> {
    let waiting = tokens::waiting_set(db, clinic_id, doctor_id, date).await?;
    let updates = rank_waiting(&waiting, minutes_per_patient);
    let written = tokens::write_positions(
        db,
        updates
            .into_iter()
            .map(|u| (u.token_id, u.position, u.estimated_wait_minutes))
            .collect(),
    )
    .await?;
    debug!(clinic_id, doctor_id, %date, written, "queue positions recalculated");
    Ok(written)
}
