// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling queue worker.
//!
//! One worker per queue topic: drain pending entries, dispatch each to the
//! handler, `ack` on success and `fail` on error (redelivery and
//! dead-lettering are queue policy). A reclaim pass before each drain
//! returns entries orphaned by a crashed worker.

use std::time::Duration;

use tidings_core::TidingsError;
use tidings_storage::models::QueueEntry;
use tidings_storage::queries::queue;
use tidings_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub queue_name: String,
    pub poll_interval: Duration,
}

/// Run a consumer loop until the shutdown token fires.
pub async fn run_worker<F, Fut>(
    db: Database,
    options: WorkerOptions,
    shutdown: CancellationToken,
    mut handler: F,
) where
    F: FnMut(QueueEntry) -> Fut,
    Fut: Future<Output = Result<(), TidingsError>>,
{
    info!(queue = %options.queue_name, "queue worker started");
    loop {
        match queue::reclaim_expired(&db, &options.queue_name).await {
            Ok(0) => {}
            Ok(n) => warn!(queue = %options.queue_name, reclaimed = n, "reclaimed expired claims"),
            Err(e) => error!(queue = %options.queue_name, error = %e, "reclaim pass failed"),
        }

        // Drain everything pending before sleeping.
        loop {
            if shutdown.is_cancelled() {
                info!(queue = %options.queue_name, "queue worker stopped");
                return;
            }
            let entry = match queue::dequeue(&db, &options.queue_name).await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!(queue = %options.queue_name, error = %e, "dequeue failed");
                    break;
                }
            };

            let id = entry.id;
            match handler(entry).await {
                Ok(()) => {
                    if let Err(e) = queue::ack(&db, id).await {
                        error!(queue = %options.queue_name, entry = id, error = %e, "ack failed");
                    }
                }
                Err(e) => {
                    warn!(queue = %options.queue_name, entry = id, error = %e, "handler failed");
                    match queue::fail(&db, id).await {
                        Ok(true) => {
                            error!(queue = %options.queue_name, entry = id, "entry dead-lettered")
                        }
                        Ok(false) => {
                            debug!(queue = %options.queue_name, entry = id, "entry returned for redelivery")
                        }
                        Err(e) => {
                            error!(queue = %options.queue_name, entry = id, error = %e, "fail release failed")
                        }
                    }
                }
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(queue = %options.queue_name, "queue worker stopped");
                return;
            }
            _ = tokio::time::sleep(options.poll_interval) => {}
        }
    }
}
