// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Public routes serve the
//! patient app and the waiting-room display; staff routes sit behind the
//! bearer-token middleware.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use cliniq_core::CliniqError;
use cliniq_queue::QueueService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The queue core every handler delegates to.
    pub service: Arc<QueueService>,
}

/// Gateway server configuration (mirrors `GatewayConfig` from cliniq-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for staff routes (None = auth disabled).
    pub bearer_token: Option<String>,
}

/// Build the full gateway router.
///
/// Public: health, display feed, per-doctor queue, token-by-phone.
/// Staff (bearer auth): token creation, offline sync, call-next,
/// transitions, stats.
pub fn build_router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/display/{clinic}", get(handlers::get_display))
        .route("/v1/queues/{clinic}/{doctor}", get(handlers::get_queue))
        .route("/v1/tokens/by-phone/{phone}", get(handlers::get_by_phone))
        .with_state(state.clone());

    let staff_routes = Router::new()
        .route("/v1/tokens", post(handlers::post_tokens))
        .route("/v1/tokens/sync", post(handlers::post_sync))
        .route(
            "/v1/queues/{clinic}/{doctor}/call-next",
            post(handlers::post_call_next),
        )
        .route("/v1/tokens/{id}/{action}", post(handlers::post_transition))
        .route("/v1/stats/{clinic}", get(handlers::get_stats))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve the gateway until the task is aborted.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), CliniqError> {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    let app = build_router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CliniqError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| CliniqError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
