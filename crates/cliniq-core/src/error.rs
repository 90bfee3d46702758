// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the cliniq queue token service.

use thiserror::Error;

use crate::types::{TokenAction, TokenStatus};

/// The primary error type used across the cliniq queue core and its adapters.
#[derive(Debug, Error)]
pub enum CliniqError {
    /// Request rejected before anything was persisted (missing phone, empty name, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Two writers raced on the same allocation key. Transient; the sequencer
    /// retries internally and only surfaces this once retries are exhausted.
    #[error("allocation conflict for key {key}")]
    AllocationConflict { key: String },

    /// The patient already holds a non-terminal token for this doctor and day.
    /// Raised per item by the offline reconciler, never for the whole batch.
    #[error("patient already has an active token {display_token}")]
    DuplicateActiveToken { display_token: String },

    /// Attempted state change not legal for the token's current state.
    /// Carries the current state so the caller can resynchronize its view.
    #[error("cannot apply {action} to a token in state {from}")]
    InvalidTransition {
        from: TokenStatus,
        action: TokenAction,
    },

    /// Token id did not resolve to a stored token.
    #[error("token not found: {0}")]
    NotFound(String),

    /// Storage backend errors (database connection, query failure, mapping).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound notification failure. Always logged, never escalated to the
    /// caller of the triggering transition.
    #[error("notification error: {0}")]
    Notify(String),

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
