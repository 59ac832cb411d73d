// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingress.
//!
//! Runs after the gateway has already authenticated the request body.
//! Resolves the tenant from the envelope's phone number id, logs the raw
//! payload, and either publishes a normalized event to the incoming queue
//! or short-circuits status callbacks to the reconciler.

use std::time::Duration;

use tidings_core::{run_with_tenant, QueueEnvelope, TidingsError, WorkspaceId, INCOMING_QUEUE};
use tidings_resilience::{retry, RetryPolicy};
use tidings_storage::queries::{events, queue, workspaces};
use tidings_storage::Database;
use tidings_whatsapp::WebhookEnvelope;
use tracing::{debug, error, info, warn};

use crate::reconcile;

/// What the ingress did with an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressOutcome {
    /// Non-actionable event (no phone number id); acknowledged and dropped.
    Ignored,
    /// Normalized event published to the incoming queue.
    Queued,
    /// Status callback applied synchronously by the reconciler.
    Reconciled,
}

#[derive(Debug, Clone)]
pub struct WebhookIngress {
    db: Database,
    publish_timeout: Duration,
    publish_policy: RetryPolicy,
    max_delivery_attempts: i64,
}

impl WebhookIngress {
    pub fn new(
        db: Database,
        publish_timeout: Duration,
        publish_policy: RetryPolicy,
        max_delivery_attempts: i64,
    ) -> Self {
        Self {
            db,
            publish_timeout,
            publish_policy,
            max_delivery_attempts,
        }
    }

    /// Process one authenticated webhook delivery.
    ///
    /// `raw` is the parsed JSON of the body as received; it is what gets
    /// logged and republished, so consumers see the provider's envelope
    /// unmodified.
    ///
    /// Returns [`TidingsError::WorkspaceNotFound`] when the phone number id
    /// maps to no provisioned workspace. That is a provisioning error and
    /// must not be silently acknowledged.
    pub async fn process(
        &self,
        envelope: &WebhookEnvelope,
        raw: &serde_json::Value,
    ) -> Result<IngressOutcome, TidingsError> {
        let Some(phone_number_id) = envelope.phone_number_id() else {
            debug!("webhook envelope carries no phone number id, ignoring");
            return Ok(IngressOutcome::Ignored);
        };

        let workspace = workspaces::find_by_phone_number_id(&self.db, phone_number_id)
            .await?
            .ok_or_else(|| TidingsError::WorkspaceNotFound {
                phone_number_id: phone_number_id.to_string(),
            })?;
        let workspace_id = WorkspaceId::from(workspace.id.as_str());

        // Status callbacks are idempotent by message id and latency
        // sensitive; they bypass the queue entirely.
        if let Some(value) = envelope.first_value()
            && let Some(status) = value.statuses.first()
        {
            reconcile::apply(&self.db, &workspace_id, status).await?;
            return Ok(IngressOutcome::Reconciled);
        }

        run_with_tenant(workspace_id.clone(), async {
            // Raw event log is best-effort; a failure here must not block
            // the queue publish.
            if let Err(e) = events::insert_event(&self.db, &raw.to_string()).await {
                warn!(error = %e, "failed to log raw webhook event");
            }

            let normalized = QueueEnvelope {
                workspace_id: workspace_id.clone(),
                payload: raw.clone(),
            };
            let payload = serde_json::to_string(&normalized)
                .map_err(|e| TidingsError::Queue(format!("failed to encode envelope: {e}")))?;

            let outcome = retry(&self.publish_policy, || async {
                match tokio::time::timeout(
                    self.publish_timeout,
                    queue::enqueue(&self.db, INCOMING_QUEUE, &payload, self.max_delivery_attempts),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TidingsError::Timeout {
                        duration: self.publish_timeout,
                    }),
                }
            })
            .await;

            match outcome.result {
                Ok(id) => {
                    info!(queue_entry = id, workspace = %workspace_id, "inbound event queued");
                }
                Err(e) => {
                    // The raw event is persisted but never reached the
                    // queue; flag it for operational alerting rather than
                    // failing the provider's delivery.
                    error!(
                        error = %e,
                        workspace = %workspace_id,
                        attempts = outcome.attempts,
                        "publish failed after retries, inbound message at risk"
                    );
                }
            }
            Ok(IngressOutcome::Queued)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tidings_storage::models::Workspace;

    fn ingress(db: &Database) -> WebhookIngress {
        WebhookIngress::new(
            db.clone(),
            Duration::from_secs(5),
            RetryPolicy::linear(3, Duration::from_millis(1)),
            3,
        )
    }

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ingress.db").to_str().unwrap())
            .await
            .unwrap();
        workspaces::insert_workspace(
            &db,
            &Workspace {
                id: "W1".to_string(),
                name: "Acme".to_string(),
                phone_number_id: "111222333".to_string(),
                owner_id: "owner-1".to_string(),
                created_at: String::new(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    fn message_envelope(phone_number_id: &str) -> serde_json::Value {
        serde_json::json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": phone_number_id},
                "messages": [{
                    "from": "1555",
                    "id": "wamid.1",
                    "timestamp": "1709123456",
                    "type": "text",
                    "text": {"body": "hi"}
                }]
            }}]}]
        })
    }

    #[tokio::test]
    async fn actionable_envelope_is_logged_and_queued() {
        let (db, _dir) = setup().await;
        let raw = message_envelope("111222333");
        let envelope: WebhookEnvelope = serde_json::from_value(raw.clone()).unwrap();

        let outcome = ingress(&db).process(&envelope, &raw).await.unwrap();
        assert_eq!(outcome, IngressOutcome::Queued);

        let entry = queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().unwrap();
        let normalized: QueueEnvelope = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(normalized.workspace_id.as_str(), "W1");
        assert_eq!(normalized.payload, raw);

        let logged = run_with_tenant(WorkspaceId::from("W1"), events::count_events(&db))
            .await
            .unwrap();
        assert_eq!(logged, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_phone_number_id_is_a_noop_success() {
        let (db, _dir) = setup().await;
        let raw = serde_json::json!({"entry": []});
        let envelope: WebhookEnvelope = serde_json::from_value(raw.clone()).unwrap();

        let outcome = ingress(&db).process(&envelope, &raw).await.unwrap();
        assert_eq!(outcome, IngressOutcome::Ignored);
        assert!(queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_tenant_fails_loud() {
        let (db, _dir) = setup().await;
        let raw = message_envelope("999999999");
        let envelope: WebhookEnvelope = serde_json::from_value(raw.clone()).unwrap();

        let err = ingress(&db).process(&envelope, &raw).await.unwrap_err();
        assert!(matches!(err, TidingsError::WorkspaceNotFound { .. }));
        assert!(queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_envelope_short_circuits_the_queue() {
        let (db, _dir) = setup().await;
        let raw = serde_json::json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": "111222333"},
                "statuses": [{
                    "id": "wamid.ext",
                    "status": "delivered",
                    "timestamp": "1709123500",
                    "recipient_id": "1555"
                }]
            }}]}]
        });
        let envelope: WebhookEnvelope = serde_json::from_value(raw.clone()).unwrap();

        let outcome = ingress(&db).process(&envelope, &raw).await.unwrap();
        assert_eq!(outcome, IngressOutcome::Reconciled);
        assert!(queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
