// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound consumer.
//!
//! Consumes normalized `{workspace_id, payload}` events from the incoming
//! queue under at-least-once delivery. The unique constraint on the
//! provider message id is the dedup mechanism: a duplicate insert means a
//! webhook re-delivery, and the conversation upsert is skipped so the
//! unread counter is never double-applied.

use chrono::{DateTime, SecondsFormat, Utc};
use tidings_core::{run_with_tenant, QueueEnvelope, TidingsError};
use tidings_storage::models::InboundMessage;
use tidings_storage::queries::{conversations, inbound};
use tidings_storage::Database;
use tidings_whatsapp::WebhookEnvelope;
use tracing::{debug, error, info, warn};

/// Provider epoch-seconds string to RFC 3339 with milliseconds, matching
/// the storage timestamp format. Falls back to now.
pub(crate) fn epoch_to_timestamp(raw: Option<&str>) -> String {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Process one dequeued inbound event inside its tenant context.
///
/// Errors propagate only when the primary message insert fails for a
/// non-duplicate reason; the queue's redelivery policy handles those.
pub async fn process_incoming(db: &Database, event: QueueEnvelope) -> Result<(), TidingsError> {
    let workspace_id = event.workspace_id.clone();
    run_with_tenant(workspace_id.clone(), async move {
        let envelope: WebhookEnvelope = serde_json::from_value(event.payload.clone())
            .map_err(|e| TidingsError::Queue(format!("malformed inbound event payload: {e}")))?;

        let Some(value) = envelope.first_value() else {
            debug!("inbound event carries no change value, dropping");
            return Ok(());
        };
        let Some(message) = value.messages.first() else {
            debug!("inbound event carries no messages array, dropping");
            return Ok(());
        };
        let Some(provider_message_id) = message.id.as_deref() else {
            warn!("inbound message missing provider message id, dropping");
            return Ok(());
        };

        let phone_number_id = value
            .metadata
            .as_ref()
            .map(|m| m.phone_number_id.clone())
            .unwrap_or_default();
        let sender_name = value
            .contacts
            .iter()
            .find(|c| c.wa_id == message.from)
            .and_then(|c| c.profile.as_ref())
            .map(|p| p.name.clone());
        let message_timestamp = epoch_to_timestamp(message.timestamp.as_deref());

        let record = InboundMessage {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.as_str().to_string(),
            phone_number_id: phone_number_id.clone(),
            contact: message.from.clone(),
            sender_name,
            provider_message_id: provider_message_id.to_string(),
            message_type: message.kind.label().to_string(),
            text_body: message.kind.text_body().map(str::to_string),
            media_id: message.kind.media_id().map(str::to_string),
            message_timestamp: message_timestamp.clone(),
            status: None,
            status_updated_at: None,
            raw_payload: event.payload.to_string(),
            created_at: String::new(),
        };

        match inbound::insert_inbound(db, &record).await {
            Ok(()) => {
                info!(
                    provider_message_id,
                    from = %message.from,
                    workspace = %workspace_id,
                    "stored inbound message"
                );
            }
            Err(e) if e.is_duplicate_key() => {
                // Webhook re-delivery. The conversation was already
                // updated by the first delivery.
                warn!(provider_message_id, "duplicate inbound message, skipping conversation upsert");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let preview = message.kind.preview();
        if let Err(e) = conversations::upsert_inbound(
            db,
            &phone_number_id,
            &message.from,
            &preview,
            &message_timestamp,
        )
        .await
        {
            // The message is durably stored; forcing a redelivery over a
            // preview failure would reprocess a successful ingest.
            error!(
                error = %e,
                workspace = %workspace_id,
                contact = %message.from,
                "conversation upsert failed after inbound insert"
            );
        }
        Ok(())
    })
    .await
}
