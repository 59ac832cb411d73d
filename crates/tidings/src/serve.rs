// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidings serve` command implementation.
//!
//! Wires the full pipeline: SQLite storage, the Graph API client, the two
//! queue workers, and the webhook gateway. Supports graceful shutdown via
//! signal handlers.

use std::time::Duration;

use tidings_config::TidingsConfig;
use tidings_core::{TidingsError, INCOMING_QUEUE, OUTGOING_QUEUE};
use tidings_gateway::{GatewayState, ServerConfig};
use tidings_pipeline::{inbound, OutboundSender, WebhookIngress, WorkerOptions};
use tidings_resilience::RetryPolicy;
use tidings_storage::Database;
use tidings_whatsapp::GraphClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the `tidings serve` command.
pub async fn run_serve(config: TidingsConfig) -> Result<(), TidingsError> {
    init_tracing(&config.service.log_level);

    info!("starting tidings serve");

    let whatsapp = &config.whatsapp;
    let access_token = whatsapp
        .access_token
        .as_deref()
        .ok_or_else(|| TidingsError::Config("whatsapp.access_token is not set".to_string()))?;
    let app_secret = whatsapp
        .app_secret
        .as_deref()
        .ok_or_else(|| TidingsError::Config("whatsapp.app_secret is not set".to_string()))?;
    let verify_token = whatsapp
        .verify_token
        .as_deref()
        .ok_or_else(|| TidingsError::Config("whatsapp.verify_token is not set".to_string()))?;

    let db =
        Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = %config.storage.database_path, wal = config.storage.wal_mode, "storage initialized");

    let client = GraphClient::new(
        access_token,
        whatsapp.graph_api_version.clone(),
        whatsapp.graph_base_url.clone(),
        whatsapp.default_phone_number_id.clone(),
    )?;

    let shutdown = install_signal_handler();
    let poll_interval = Duration::from_millis(config.queue.poll_interval_ms);
    let max_delivery_attempts = i64::from(config.queue.max_delivery_attempts);

    // Inbound consumer worker.
    let inbound_worker = {
        let db = db.clone();
        let shutdown = shutdown.clone();
        let options = WorkerOptions {
            queue_name: INCOMING_QUEUE.to_string(),
            poll_interval,
        };
        tokio::spawn(async move {
            let handler_db = db.clone();
            tidings_pipeline::run_worker(db, options, shutdown, move |entry| {
                let db = handler_db.clone();
                async move {
                    let event = serde_json::from_str(&entry.payload).map_err(|e| {
                        TidingsError::Queue(format!("malformed incoming entry: {e}"))
                    })?;
                    inbound::process_incoming(&db, event).await
                }
            })
            .await;
        })
    };

    // Outbound sender worker.
    let outbound_worker = {
        let db = db.clone();
        let shutdown = shutdown.clone();
        let sender = OutboundSender::new(
            db.clone(),
            client,
            RetryPolicy::linear(3, Duration::from_secs(1)),
        );
        let options = WorkerOptions {
            queue_name: OUTGOING_QUEUE.to_string(),
            poll_interval,
        };
        tokio::spawn(async move {
            tidings_pipeline::run_worker(db, options, shutdown, move |entry| {
                let sender = sender.clone();
                async move {
                    let request = serde_json::from_str(&entry.payload).map_err(|e| {
                        TidingsError::Queue(format!("malformed outgoing entry: {e}"))
                    })?;
                    sender.process(request).await
                }
            })
            .await;
        })
    };

    let ingress = WebhookIngress::new(
        db.clone(),
        Duration::from_secs(config.queue.publish_timeout_secs),
        RetryPolicy::linear(
            config.queue.publish_max_attempts,
            Duration::from_secs(1),
        ),
        max_delivery_attempts,
    );
    let state = GatewayState {
        db: db.clone(),
        ingress,
        app_secret: app_secret.to_string(),
        verify_token: verify_token.to_string(),
        max_delivery_attempts,
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    tokio::select! {
        result = tidings_gateway::start_server(&server_config, state) => {
            warn!("gateway server exited");
            result?;
        }
        _ = shutdown.cancelled() => {
            info!("shutdown requested, stopping workers");
        }
    }

    shutdown.cancel();
    let _ = inbound_worker.await;
    let _ = outbound_worker.await;
    db.close().await?;
    info!("tidings serve stopped");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] cancelled when either signal arrives.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidings={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
