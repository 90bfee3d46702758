// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers mapping routes 1:1 onto queue service operations.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use cliniq_core::types::{Token, TokenAction};
use cliniq_core::CliniqError;
use cliniq_queue::{
    CreateTokenRequest, DisplayFeed, DoctorQueueView, OfflineTokenUpload, QueueStats, SyncReport,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for POST /v1/tokens/sync.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub tokens: Vec<OfflineTokenUpload>,
    pub device_id: String,
}

/// Query parameters for GET /v1/stats/{clinic}.
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    /// Day to report on (YYYY-MM-DD); defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// POST /v1/tokens -- issue a token on the online path.
pub async fn post_tokens(
    State(state): State<GatewayState>,
    Json(body): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<Token>), ApiError> {
    let token = state.service.create_token(body).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// POST /v1/tokens/sync -- reconcile a batch of offline-created tokens.
pub async fn post_sync(
    State(state): State<GatewayState>,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncReport>, ApiError> {
    let report = state
        .service
        .sync_offline_batch(body.tokens, &body.device_id)
        .await?;
    Ok(Json(report))
}

/// GET /v1/queues/{clinic}/{doctor} -- the per-doctor queue view.
pub async fn get_queue(
    State(state): State<GatewayState>,
    Path((clinic_id, doctor_id)): Path<(String, String)>,
) -> Result<Json<DoctorQueueView>, ApiError> {
    let view = state.service.get_queue(&clinic_id, &doctor_id).await?;
    Ok(Json(view))
}

/// GET /v1/display/{clinic} -- the waiting-room display feed.
pub async fn get_display(
    State(state): State<GatewayState>,
    Path(clinic_id): Path<String>,
) -> Result<Json<DisplayFeed>, ApiError> {
    let feed = state.service.get_display_feed(&clinic_id).await?;
    Ok(Json(feed))
}

/// POST /v1/queues/{clinic}/{doctor}/call-next -- call the next patient.
///
/// 404 when nobody is waiting.
pub async fn post_call_next(
    State(state): State<GatewayState>,
    Path((clinic_id, doctor_id)): Path<(String, String)>,
) -> Result<Json<Token>, ApiError> {
    match state.service.call_next(&clinic_id, &doctor_id).await? {
        Some(token) => Ok(Json(token)),
        None => Err(CliniqError::NotFound(format!(
            "no patients waiting for {clinic_id}/{doctor_id}"
        ))
        .into()),
    }
}

/// POST /v1/tokens/{id}/{action} -- drive the token state machine.
///
/// `action` is one of start, complete, no-show, skip, recall, cancel.
pub async fn post_transition(
    State(state): State<GatewayState>,
    Path((token_id, action)): Path<(String, String)>,
) -> Result<Json<Token>, ApiError> {
    let action = TokenAction::from_str(&action.replace('-', "_"))
        .map_err(|_| CliniqError::Validation(format!("unknown action `{action}`")))?;
    let token = state.service.transition(&token_id, action).await?;
    Ok(Json(token))
}

/// GET /v1/tokens/by-phone/{phone} -- a patient's active tokens today.
pub async fn get_by_phone(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
) -> Result<Json<Vec<Token>>, ApiError> {
    let tokens = state.service.tokens_by_phone(&phone).await?;
    Ok(Json(tokens))
}

/// GET /v1/stats/{clinic} -- daily queue statistics.
pub async fn get_stats(
    State(state): State<GatewayState>,
    Path(clinic_id): Path<String>,
    Query(params): Query<StatsParams>,
) -> Result<Json<QueueStats>, ApiError> {
    let stats = state.service.get_stats(&clinic_id, params.date).await?;
    Ok(Json(stats))
}

/// GET /health -- liveness for systemd and load balancers.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_deserializes() {
        let req: SyncRequest = serde_json::from_str(
            r#"{
                "device_id": "tablet-7",
                "tokens": [{
                    "clinic_id": "clinic-1",
                    "doctor_id": "doc-1",
                    "patient_name": "Ravi Shah",
                    "patient_phone": "9990002222",
                    "local_created_at": "2026-08-08T08:40:00Z"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(req.device_id, "tablet-7");
        assert_eq!(req.tokens.len(), 1);
    }

    #[test]
    fn stats_params_parse_optional_date() {
        let p: StatsParams = serde_json::from_str(r#"{"date": "2026-08-08"}"#).unwrap();
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2026, 8, 8));
        let p: StatsParams = serde_json::from_str("{}").unwrap();
        assert!(p.date.is_none());
    }

    #[test]
    fn action_path_segment_accepts_kebab_case() {
        assert_eq!(
            TokenAction::from_str(&"no-show".replace('-', "_")).unwrap(),
            TokenAction::NoShow
        );
    }

    #[test]
    fn health_response_serializes() {
        let json = serde_json::to_string(&HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }
}
