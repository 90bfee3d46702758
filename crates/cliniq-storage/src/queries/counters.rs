// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-lane allocation counters.
//!
//! One row per `(clinic, doctor, day, prefix)` key, bumped with an UPSERT
//! inside the same transaction as the token insert so the read-increment
//! and the insert are a single atomic unit.

use chrono::NaiveDate;
use cliniq_core::CliniqError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Bump the counter for the given key and return the new value.
///
/// Must run inside the caller's transaction; see
/// [`crate::queries::tokens::allocate_and_insert`].
pub(crate) fn bump(
    conn: &rusqlite::Connection,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    prefix: &str,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO token_counters (clinic_id, doctor_id, token_date, token_prefix, last_number)
         VALUES (?1, ?2, ?3, ?4, 1)
         ON CONFLICT (clinic_id, doctor_id, token_date, token_prefix)
         DO UPDATE SET last_number = last_number + 1
         RETURNING last_number",
        params![clinic_id, doctor_id, date, prefix],
        |row| row.get(0),
    )
}

/// Read the last allocated number for a key, if the lane has issued anything.
pub async fn last_number(
    db: &Database,
    clinic_id: &str,
    doctor_id: &str,
    date: NaiveDate,
    prefix: &str,
) -> Result<Option<i64>, CliniqError> {
    let clinic_id = clinic_id.to_string();
    let doctor_id = doctor_id.to_string();
    let prefix = prefix.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT last_number FROM token_counters
                 WHERE clinic_id = ?1 AND doctor_id = ?2 AND token_date = ?3 AND token_prefix = ?4",
                params![clinic_id, doctor_id, date, prefix],
                |row| row.get(0),
            );
            match result {
                Ok(n) => Ok(Some(n)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}
