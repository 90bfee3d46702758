// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only notification log.
//!
//! One row per outreach attempt, keyed by token id. The log replaces an
//! embedded per-token array so retention can be managed independently and
//! the sweep's idempotency window can be queried cheaply.

use chrono::{DateTime, Duration, Utc};
use cliniq_core::types::{NotificationChannel, NotificationStatus, NotificationType};
use cliniq_core::CliniqError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::NotificationEntry;

/// Append one notification attempt. Returns the log row id.
pub async fn append(
    db: &Database,
    token_id: &str,
    kind: NotificationType,
    channel: NotificationChannel,
    status: NotificationStatus,
    sent_at: DateTime<Utc>,
) -> Result<i64, CliniqError> {
    let token_id = token_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notification_log (token_id, kind, channel, status, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    token_id,
                    kind.to_string(),
                    channel.to_string(),
                    status.to_string(),
                    sent_at
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a non-failed notification of `kind` went to this token within the
/// last `window_minutes`. The sweep's idempotency check.
pub async fn was_sent_within(
    db: &Database,
    token_id: &str,
    kind: NotificationType,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> Result<bool, CliniqError> {
    let token_id = token_id.to_string();
    let cutoff = now - Duration::minutes(window_minutes);
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notification_log
                 WHERE token_id = ?1 AND kind = ?2 AND status != 'failed' AND sent_at > ?3",
                params![token_id, kind.to_string(), cutoff],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Full outreach history for a token, oldest first.
pub async fn list_for_token(
    db: &Database,
    token_id: &str,
) -> Result<Vec<NotificationEntry>, CliniqError> {
    let token_id = token_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, token_id, kind, channel, status, sent_at
                 FROM notification_log WHERE token_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![token_id], |row| {
                let kind: String = row.get(2)?;
                let channel: String = row.get(3)?;
                let status: String = row.get(4)?;
                Ok(NotificationEntry {
                    id: row.get(0)?,
                    token_id: row.get(1)?,
                    kind: kind.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    channel: channel.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    status: status.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    sent_at: row.get(5)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}
