// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token persistence: atomic allocation, CAS status transitions, and the
//! read queries behind the queue views.

use chrono::NaiveDate;
use cliniq_core::types::{format_display_token, SyncStatus, Token, TokenStatus};
use cliniq_core::CliniqError;
use rusqlite::{params, Row};

use crate::database::{is_unique_violation, map_tr_err, Database};
use crate::models::TokenDraft;
use crate::queries::counters;

/// Column list shared by every SELECT so `token_from_row` indexes stay valid.
const TOKEN_COLUMNS: &str = "id, clinic_id, doctor_id, token_date, token_prefix, token_number, \
     display_token, patient_id, patient_name, patient_phone, booking_type, appointment_id, \
     status, priority, queue_position, estimated_wait_minutes, issued_at, called_at, \
     consultation_started_at, consultation_ended_at, consultation_minutes, notes, \
     created_offline, device_id, local_created_at, synced_at, sync_status, conflict_details";

/// Waiting-set ordering: priority tier first, then arrival order.
const PRIORITY_RANK: &str =
    "CASE priority WHEN 'emergency' THEN 2 WHEN 'priority' THEN 1 ELSE 0 END";

fn parse_enum<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn token_from_row(row: &Row) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        doctor_id: row.get(2)?,
        token_date: row.get(3)?,
        token_prefix: row.get(4)?,
        token_number: row.get(5)?,
        display_token: row.get(6)?,
        patient_id: row.get(7)?,
        patient_name: row.get(8)?,
        patient_phone: row.get(9)?,
        booking_type: parse_enum(10, row.get::<_, String>(10)?)?,
        appointment_id: row.get(11)?,
        status: parse_enum(12, row.get::<_, String>(12)?)?,
        priority: parse_enum(13, row.get::<_, String>(13)?)?,
        queue_position: row.get(14)?,
        estimated_wait_minutes: row.get(15)?,
        issued_at: row.get(16)?,
        called_at: row.get(17)?,
        consultation_started_at: row.get(18)?,
        consultation_ended_at: row.get(19)?,
        consultation_minutes: row.get(20)?,
        notes: row.get(21)?,
        offline: cliniq_core::types::OfflineSync {
            created_offline: row.get(22)?,
            device_id: row.get(23)?,
            local_created_at: row.get(24)?,
            synced_at: row.get(25)?,
            sync_status: parse_enum::<SyncStatus>(26, row.get::<_, String>(26)?)?,
            conflict_details: row.get(27)?,
        },
    })
}

/// Allocate the next token number for the draft's lane and insert the token,
/// atomically.
///
/// The counter bump and the INSERT run inside one transaction on the single
/// writer thread, so no two tokens can observe the same number. A UNIQUE
/// violation on the allocation key (counter reset, manual insert) maps to
/// `AllocationConflict` for the sequencer to retry.
pub async fn allocate_and_insert(db: &Database, draft: TokenDraft) -> Result<Token, CliniqError> {
    let key = draft.allocation_key();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let number = counters::bump(
                &tx,
                &draft.clinic_id,
                &draft.doctor_id,
                draft.token_date,
                &draft.token_prefix,
            )?;
            let token = Token {
                id: draft.id,
                clinic_id: draft.clinic_id,
                doctor_id: draft.doctor_id,
                token_date: draft.token_date,
                token_prefix: draft.token_prefix.clone(),
                token_number: number,
                display_token: format_display_token(&draft.token_prefix, number),
                patient_id: draft.patient_id,
                patient_name: draft.patient_name,
                patient_phone: draft.patient_phone,
                booking_type: draft.booking_type,
                appointment_id: draft.appointment_id,
                status: TokenStatus::Waiting,
                priority: draft.priority,
                queue_position: None,
                estimated_wait_minutes: None,
                issued_at: draft.issued_at,
                called_at: None,
                consultation_started_at: None,
                consultation_ended_at: None,
                consultation_minutes: None,
                notes: draft.notes,
                offline: draft.offline,
            };
            tx.execute(
                "INSERT INTO tokens (id, clinic_id, doctor_id, token_date, token_prefix, \
                 token_number, display_token, patient_id, patient_name, patient_phone, \
                 booking_type, appointment_id, status, priority, queue_position, \
                 estimated_wait_minutes, issued_at, called_at, consultation_started_at, \
                 consultation_ended_at, consultation_minutes, notes, created_offline, \
                 device_id, local_created_at, synced_at, sync_status, conflict_details) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                 ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
                params![
                    token.id,
                    token.clinic_id,
                    token.doctor_id,
                    token.token_date,
                    token.token_prefix,
                    token.token_number,
                    token.display_token,
                    token.patient_id,
                    token.patient_name,
                    token.patient_phone,
                    token.booking_type.to_string(),
                    token.appointment_id,
                    token.status.to_string(),
                    token.priority.to_string(),
                    token.queue_position,
                    token.estimated_wait_minutes,
                    token.issued_at,
                    token.called_at,
                    token.consultation_started_at,
                    token.consultation_ended_at,
                    token.consultation_minutes,
                    token.notes,
                    token.offline.created_offline,
                    token.offline.device_id,
                    token.offline.local_created_at,
                    token.offline.synced_at,
                    token.offline.sync_status.to_string(),
                    token.offline.conflict_details,
                ],
            )?;
            tx.commit()?;
            Ok(token)
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CliniqError::AllocationConflict { key }
            } else {
                map_tr_err(e)
            }
        })
}

/// Get a token by id.
pub async fn get_token(db: &Database, id: &str) -> Result<Option<Token>, CliniqError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], token_from_row);
            match result {
                Ok(token) => Ok(Some(token)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find the patient's non-terminal token for a doctor/day, if any.
///
/// This is the conflict invariant's lookup: at most one token outside
/// {completed, cancelled, no_show} may exist per (clinic, doctor, day, phone).
pub async fn find_active_for_patient(
    db: &Database,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    phone: &str,
) -> Result<Option<Token>, CliniqError> {
    let clinic_id = clinic_id.to_string();
    let doctor_id = doctor_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens
                 WHERE clinic_id = ?1 AND doctor_id = ?2 AND token_date = ?3
                   AND patient_phone = ?4
                   AND status NOT IN ('completed', 'cancelled', 'no_show')
                 ORDER BY token_number ASC
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(params![clinic_id, doctor_id, date, phone], token_from_row);
            match result {
                Ok(token) => Ok(Some(token)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a token by the offline idempotency marker
/// `(device_id, local_created_at, patient_phone)`.
///
/// Used by the reconciler to make replayed batches no-ops.
pub async fn find_by_sync_marker(
    db: &Database,
    device_id: &str,
    local_created_at: chrono::DateTime<chrono::Utc>,
    phone: &str,
) -> Result<Option<Token>, CliniqError> {
    let device_id = device_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens
                 WHERE device_id = ?1 AND local_created_at = ?2 AND patient_phone = ?3
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(params![device_id, local_created_at, phone], token_from_row);
            match result {
                Ok(token) => Ok(Some(token)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The waiting set for a doctor/day, in serving order.
pub async fn waiting_set(
    db: &Database,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
) -> Result<Vec<Token>, CliniqError> {
    doctor_day_set(db, clinic_id, doctor_id, date, "status = 'waiting'").await
}

/// All non-terminal tokens for a doctor/day (waiting, called, in
/// consultation), in serving order.
pub async fn active_set(
    db: &Database,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
) -> Result<Vec<Token>, CliniqError> {
    doctor_day_set(
        db,
        clinic_id,
        doctor_id,
        date,
        "status IN ('waiting', 'called', 'in_consultation')",
    )
    .await
}

/// Shared SELECT body for doctor/day scoped queries in serving order.
async fn doctor_day_set(
    db: &Database,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    status_predicate: &'static str,
) -> Result<Vec<Token>, CliniqError> {
    let clinic_id = clinic_id.to_string();
    let doctor_id = doctor_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens
                 WHERE clinic_id = ?1 AND doctor_id = ?2 AND token_date = ?3
                   AND {status_predicate}
                 ORDER BY {PRIORITY_RANK} DESC, token_number ASC"
            ))?;
            let rows = stmt.query_map(params![clinic_id, doctor_id, date], token_from_row)?;
            let mut tokens = Vec::new();
            for row in rows {
                tokens.push(row?);
            }
            Ok(tokens)
        })
        .await
        .map_err(map_tr_err)
}

/// All non-terminal tokens for a clinic/day across doctors, for the
/// waiting-room display feed.
pub async fn clinic_active_set(
    db: &Database,
    clinic_id: &str,
    date: NaiveDate,
) -> Result<Vec<Token>, CliniqError> {
    let clinic_id = clinic_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens
                 WHERE clinic_id = ?1 AND token_date = ?2
                   AND status IN ('waiting', 'called', 'in_consultation')
                 ORDER BY doctor_id ASC, {PRIORITY_RANK} DESC, token_number ASC"
            ))?;
            let rows = stmt.query_map(params![clinic_id, date], token_from_row)?;
            let mut tokens = Vec::new();
            for row in rows {
                tokens.push(row?);
            }
            Ok(tokens)
        })
        .await
        .map_err(map_tr_err)
}

/// Every token issued for a clinic/day, terminal states included. Stats input.
pub async fn tokens_for_day(
    db: &Database,
    clinic_id: &str,
    date: NaiveDate,
) -> Result<Vec<Token>, CliniqError> {
    let clinic_id = clinic_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens
                 WHERE clinic_id = ?1 AND token_date = ?2
                 ORDER BY token_number ASC"
            ))?;
            let rows = stmt.query_map(params![clinic_id, date], token_from_row)?;
            let mut tokens = Vec::new();
            for row in rows {
                tokens.push(row?);
            }
            Ok(tokens)
        })
        .await
        .map_err(map_tr_err)
}

/// A patient's non-terminal tokens for a day, looked up by phone.
pub async fn active_by_phone(
    db: &Database,
    phone: &str,
    date: NaiveDate,
) -> Result<Vec<Token>, CliniqError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens
                 WHERE patient_phone = ?1 AND token_date = ?2
                   AND status NOT IN ('completed', 'cancelled', 'no_show')
                 ORDER BY token_number ASC"
            ))?;
            let rows = stmt.query_map(params![phone, date], token_from_row)?;
            let mut tokens = Vec::new();
            for row in rows {
                tokens.push(row?);
            }
            Ok(tokens)
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct (clinic, doctor) pairs that still have waiting patients on
/// `date`. Drives the notification sweep.
pub async fn waiting_doctor_keys(
    db: &Database,
    date: NaiveDate,
) -> Result<Vec<(String, String)>, CliniqError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT clinic_id, doctor_id FROM tokens
                 WHERE token_date = ?1 AND status = 'waiting'
                 ORDER BY clinic_id, doctor_id",
            )?;
            let rows = stmt.query_map(params![date], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
        .map_err(map_tr_err)
}

/// Persist a state transition with a compare-and-swap on the previous status.
///
/// Returns `false` (without writing) when the token is no longer in
/// `expected_from` -- a concurrent writer won the race and the caller must
/// re-read and decide again. This is what makes double-calling impossible.
pub async fn persist_transition(
    db: &Database,
    token: &Token,
    expected_from: TokenStatus,
) -> Result<bool, CliniqError> {
    let token = token.clone();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE tokens SET status = ?1, priority = ?2, queue_position = ?3,
                     estimated_wait_minutes = ?4, called_at = ?5, consultation_started_at = ?6,
                     consultation_ended_at = ?7, consultation_minutes = ?8
                 WHERE id = ?9 AND status = ?10",
                params![
                    token.status.to_string(),
                    token.priority.to_string(),
                    token.queue_position,
                    token.estimated_wait_minutes,
                    token.called_at,
                    token.consultation_started_at,
                    token.consultation_ended_at,
                    token.consultation_minutes,
                    token.id,
                    expected_from.to_string(),
                ],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Write recalculated positions and wait estimates back to the waiting set.
///
/// Each update is guarded on `status = 'waiting'` so a token that left the
/// waiting set mid-recalculation is never stamped with a stale position.
pub async fn write_positions(
    db: &Database,
    updates: Vec<(String, i64, i64)>,
) -> Result<usize, CliniqError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut written = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE tokens SET queue_position = ?2, estimated_wait_minutes = ?3
                     WHERE id = ?1 AND status = 'waiting'",
                )?;
                for (id, position, eta) in &updates {
                    written += stmt.execute(params![id, position, eta])?;
                }
            }
            tx.commit()?;
            Ok(written)
        })
        .await
        .map_err(map_tr_err)
}
