// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token sequencer: bounded-retry wrapper around the atomic
//! allocate-and-insert.
//!
//! The storage layer already serializes the counter bump and the token
//! insert in one transaction, so an [`CliniqError::AllocationConflict`] only
//! fires when the unique-index backstop trips. Retries use exponential
//! backoff starting at the configured floor; exhaustion surfaces the
//! conflict to the caller.

use std::time::Duration;

use cliniq_core::{CliniqError, Token};
use cliniq_storage::models::TokenDraft;
use cliniq_storage::queries::tokens;
use cliniq_storage::Database;
use tracing::{debug, warn};

/// Allocate the next number for the draft's lane and insert it, retrying
/// transient allocation conflicts up to `max_retries` attempts.
pub async fn allocate_with_retry(
    db: &Database,
    draft: TokenDraft,
    max_retries: u32,
    backoff_ms: u64,
) -> Result<Token, CliniqError> {
    let mut delay = Duration::from_millis(backoff_ms);
    let mut attempt: u32 = 1;
    loop {
        match tokens::allocate_and_insert(db, draft.clone()).await {
            Ok(token) => return Ok(token),
            Err(CliniqError::AllocationConflict { key }) => {
                if attempt >= max_retries {
                    warn!(%key, attempt, "allocation retries exhausted");
                    return Err(CliniqError::AllocationConflict { key });
                }
                debug!(%key, attempt, delay_ms = delay.as_millis() as u64, "allocation conflict, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
