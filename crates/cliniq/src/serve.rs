// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cliniq serve` command implementation.
//!
//! Wires storage, the notification adapter, the queue service, the periodic
//! "your turn soon" sweep, and the HTTP gateway, then waits for a shutdown
//! signal. On shutdown the background tasks stop and the WAL is
//! checkpointed.

use std::sync::Arc;
use std::time::Duration;

use cliniq_config::model::CliniqConfig;
use cliniq_core::{CliniqError, NotifierAdapter};
use cliniq_gateway::{start_server, GatewayState, ServerConfig};
use cliniq_notify::{NoopNotifier, WebhookNotifier};
use cliniq_queue::QueueService;
use cliniq_storage::Database;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Run the `cliniq serve` command until interrupted.
pub async fn run_serve(config: CliniqConfig) -> Result<(), CliniqError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting cliniq serve");

    let db = Database::open(&config.storage.database_path).await?;

    let notifier: Arc<dyn NotifierAdapter> = match &config.notify.webhook_url {
        Some(url) => {
            info!(url, "notifications relayed via webhook");
            Arc::new(WebhookNotifier::new(url.clone(), config.notify.timeout_secs)?)
        }
        None => {
            info!("no webhook relay configured -- notifications are logged and dropped");
            Arc::new(NoopNotifier)
        }
    };

    let service = Arc::new(QueueService::new(db.clone(), notifier, config.queue.clone()));

    // Periodic "your turn soon" sweep. Idempotent per (token, type, window),
    // so a missed or doubled tick is harmless.
    let sweep_service = Arc::clone(&service);
    let sweep_period = Duration::from_secs(config.queue.sweep_interval_secs);
    let sweep_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_service.run_notification_sweep().await {
                warn!(error = %e, "notification sweep failed");
            }
        }
    });

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };
    let state = GatewayState {
        service: Arc::clone(&service),
    };
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(&server_config, state).await {
            error!(error = %e, "gateway server exited");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received, stopping");

    server_handle.abort();
    sweep_handle.abort();
    db.close().await?;

    info!("shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured
/// level when set.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, using ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
