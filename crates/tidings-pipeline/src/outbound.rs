// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sender.
//!
//! Calls the Graph API with bounded linear-backoff retry, persists exactly
//! one outcome record per send request, and updates the conversation
//! aggregate when the tenant is known. A terminal send failure is a
//! recorded outcome, not a handler error: returning an error here would
//! make the queue redeliver and resend.

use chrono::{SecondsFormat, Utc};
use tidings_core::{run_with_tenant, OutboundStatus, SendRequest, TidingsError, WorkspaceId};
use tidings_resilience::RetryPolicy;
use tidings_storage::models::OutboundMessage;
use tidings_storage::queries::{conversations, outbound};
use tidings_storage::Database;
use tidings_whatsapp::GraphClient;
use tracing::{error, info, warn};

/// Workspace id stamped on records for sends with no resolved tenant.
const UNKNOWN_WORKSPACE: &str = "unknown";

/// Placeholder recorded when neither the request nor the client config
/// names a sending phone number.
const UNKNOWN_PHONE_NUMBER: &str = "unknown";

#[derive(Debug, Clone)]
pub struct OutboundSender {
    db: Database,
    client: GraphClient,
    policy: RetryPolicy,
}

impl OutboundSender {
    pub fn new(db: Database, client: GraphClient, policy: RetryPolicy) -> Self {
        Self { db, client, policy }
    }

    /// Process one send request end to end.
    pub async fn process(&self, request: SendRequest) -> Result<(), TidingsError> {
        let sent_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let phone_number_id = self
            .client
            .resolve_phone_number_id(&request)
            .unwrap_or(UNKNOWN_PHONE_NUMBER)
            .to_string();

        let outcome = tidings_resilience::retry(&self.policy, || async {
            self.client.send_message(&request).await
        })
        .await;

        let (provider_message_id, error_reason) = match &outcome.result {
            Ok(id) => {
                info!(
                    provider_message_id = %id,
                    to = %request.to,
                    attempts = outcome.attempts,
                    "whatsapp message sent"
                );
                (Some(id.clone()), None)
            }
            Err(e) => {
                warn!(
                    to = %request.to,
                    attempts = outcome.attempts,
                    error = %e,
                    "whatsapp send failed terminally"
                );
                (None, Some(e.to_string()))
            }
        };
        let success = provider_message_id.is_some();

        let text_body = match (request.message_type.as_str(), &request.text) {
            ("text", Some(text)) => Some(text.body.clone()),
            _ => None,
        };
        let record = OutboundMessage {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: request
                .workspace_id
                .as_ref()
                .map(|w| w.as_str().to_string())
                .unwrap_or_else(|| UNKNOWN_WORKSPACE.to_string()),
            phone_number_id: phone_number_id.clone(),
            recipient: request.to.clone(),
            provider_message_id,
            message_type: request.message_type.clone(),
            text_body,
            message_timestamp: sent_at.clone(),
            status: if success {
                OutboundStatus::Sent
            } else {
                OutboundStatus::Failed
            }
            .to_string(),
            error_reason,
            retry_count: i64::from(outcome.attempts),
            status_updated_at: None,
            created_at: String::new(),
        };

        // Outcome persistence is best-effort: the send already happened or
        // was already attempted, so a storage failure is an observability
        // gap, not a reason to resend.
        let persist = match &request.workspace_id {
            Some(ws) => run_with_tenant(ws.clone(), outbound::insert_outbound(&self.db, &record)).await,
            None => outbound::insert_outbound(&self.db, &record).await,
        };
        if let Err(e) = persist {
            error!(error = %e, to = %request.to, "failed to persist outbound message record");
        }

        if let Some(workspace_id) = &request.workspace_id {
            self.update_conversation(workspace_id, &request, &phone_number_id, success, &sent_at)
                .await;
        }
        Ok(())
    }

    async fn update_conversation(
        &self,
        workspace_id: &WorkspaceId,
        request: &SendRequest,
        phone_number_id: &str,
        success: bool,
        sent_at: &str,
    ) {
        let preview = request.preview();
        let result = run_with_tenant(workspace_id.clone(), async {
            if success {
                conversations::upsert_outbound_success(
                    &self.db,
                    phone_number_id,
                    &request.to,
                    &preview,
                    sent_at,
                )
                .await
            } else {
                conversations::update_preview_on_failure(
                    &self.db,
                    phone_number_id,
                    &request.to,
                    &format!("[failed] {preview}"),
                    sent_at,
                )
                .await
            }
        })
        .await;

        if let Err(e) = result {
            error!(
                error = %e,
                workspace = %workspace_id,
                contact = %request.to,
                "conversation update failed after outbound send"
            );
        }
    }
}
