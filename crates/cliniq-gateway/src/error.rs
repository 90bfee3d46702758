// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-response mapping for the HTTP boundary.
//!
//! Conflicts are distinguishable from hard failures so reception UIs can
//! offer merge/discard/force-create instead of a generic error toast.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cliniq_core::CliniqError;
use serde_json::json;
use tracing::error;

/// Wrapper turning a [`CliniqError`] into an HTTP response.
pub struct ApiError(pub CliniqError);

impl From<CliniqError> for ApiError {
    fn from(err: CliniqError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let (status, body) = match &self.0 {
            CliniqError::Validation(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            CliniqError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            // Carry the current state so the caller can resynchronize its view.
            CliniqError::InvalidTransition { from, .. } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "current_status": from }),
            ),
            CliniqError::DuplicateActiveToken { display_token } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "existing_token": display_token }),
            ),
            // Retries already exhausted inside the sequencer.
            CliniqError::AllocationConflict { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "token allocation is contended, retry shortly" }),
            ),
            CliniqError::Storage { .. }
            | CliniqError::Notify(_)
            | CliniqError::Config(_)
            | CliniqError::Internal(_) => {
                error!(error = %self.0, "internal error serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
