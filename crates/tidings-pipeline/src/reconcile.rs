// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reconciler.
//!
//! Applies provider delivery-status callbacks to whichever stored record
//! matches the provider message id. Tier order is inbound first, then
//! outbound; the first match wins. Lookups are unscoped because status
//! callbacks are not reliably scoped to messages this system originated,
//! but the tier-3 synthetic record is always stamped with the resolved
//! tenant.

use chrono::{SecondsFormat, Utc};
use tidings_core::{run_with_tenant, DeliveryStatus, TidingsError, WorkspaceId};
use tidings_storage::models::OutboundMessage;
use tidings_storage::queries::{inbound, outbound};
use tidings_storage::Database;
use tidings_whatsapp::StatusEvent;
use tracing::{debug, info};

use crate::inbound::epoch_to_timestamp;

/// Apply one status callback for the resolved tenant.
pub async fn apply(
    db: &Database,
    workspace_id: &WorkspaceId,
    event: &StatusEvent,
) -> Result<(), TidingsError> {
    let status = DeliveryStatus::parse(&event.status);
    let status_at = epoch_to_timestamp(event.timestamp.as_deref());

    if inbound::apply_status(db, &event.id, status.as_str(), &status_at).await? {
        debug!(provider_message_id = %event.id, status = %event.status, "status applied to inbound record");
        return Ok(());
    }

    if outbound::apply_status(db, &event.id, status.as_str(), &status_at).await? {
        debug!(provider_message_id = %event.id, status = %event.status, "status applied to outbound record");
        return Ok(());
    }

    // No local record: the message was sent out of band (for example via
    // the provider's console). Synthesize a minimal outbound record so the
    // conversation history stays complete.
    let synthetic = OutboundMessage {
        id: uuid::Uuid::new_v4().to_string(),
        workspace_id: workspace_id.as_str().to_string(),
        phone_number_id: String::new(),
        recipient: event
            .recipient_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        provider_message_id: Some(event.id.clone()),
        message_type: "unknown".to_string(),
        text_body: Some("[external message]".to_string()),
        message_timestamp: status_at.clone(),
        status: status.as_str().to_string(),
        error_reason: None,
        retry_count: 0,
        status_updated_at: Some(status_at),
        created_at: String::new(),
    };
    run_with_tenant(
        workspace_id.clone(),
        outbound::insert_outbound(db, &synthetic),
    )
    .await?;
    info!(
        provider_message_id = %event.id,
        status = %event.status,
        workspace = %workspace_id,
        "synthesized outbound record for external message"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tidings_storage::models::InboundMessage;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("reconcile.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    fn status_event(id: &str, status: &str) -> StatusEvent {
        StatusEvent {
            id: id.to_string(),
            status: status.to_string(),
            timestamp: Some("1709123500".to_string()),
            recipient_id: Some("1555".to_string()),
        }
    }

    fn inbound_record(provider_id: &str) -> InboundMessage {
        InboundMessage {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: String::new(),
            phone_number_id: "111".to_string(),
            contact: "1555".to_string(),
            sender_name: None,
            provider_message_id: provider_id.to_string(),
            message_type: "text".to_string(),
            text_body: Some("hi".to_string()),
            media_id: None,
            message_timestamp: "2026-02-01T00:00:00.000Z".to_string(),
            status: None,
            status_updated_at: None,
            raw_payload: "{}".to_string(),
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn tier_one_updates_matching_inbound_record() {
        let (db, _dir) = setup().await;
        run_with_tenant(
            WorkspaceId::from("W1"),
            inbound::insert_inbound(&db, &inbound_record("wamid.1")),
        )
        .await
        .unwrap();

        apply(&db, &WorkspaceId::from("W1"), &status_event("wamid.1", "read"))
            .await
            .unwrap();

        let stored = run_with_tenant(
            WorkspaceId::from("W1"),
            inbound::get_by_provider_id(&db, "wamid.1"),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(stored.status.as_deref(), Some("read"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tier_two_updates_matching_outbound_record() {
        let (db, _dir) = setup().await;
        let record = OutboundMessage {
            id: "o1".to_string(),
            workspace_id: "W1".to_string(),
            phone_number_id: "111".to_string(),
            recipient: "1555".to_string(),
            provider_message_id: Some("wamid.out.1".to_string()),
            message_type: "text".to_string(),
            text_body: Some("reply".to_string()),
            message_timestamp: "2026-02-01T00:00:00.000Z".to_string(),
            status: "sent".to_string(),
            error_reason: None,
            retry_count: 1,
            status_updated_at: None,
            created_at: String::new(),
        };
        run_with_tenant(
            WorkspaceId::from("W1"),
            outbound::insert_outbound(&db, &record),
        )
        .await
        .unwrap();

        apply(
            &db,
            &WorkspaceId::from("W1"),
            &status_event("wamid.out.1", "delivered"),
        )
        .await
        .unwrap();

        let stored = outbound::get_by_provider_id(&db, "wamid.out.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "delivered");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tier_three_synthesizes_record_for_external_message() {
        let (db, _dir) = setup().await;
        apply(
            &db,
            &WorkspaceId::from("W1"),
            &status_event("wamid.ext", "delivered"),
        )
        .await
        .unwrap();

        let stored = outbound::get_by_provider_id(&db, "wamid.ext")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.workspace_id, "W1");
        assert_eq!(stored.message_type, "unknown");
        assert_eq!(stored.status, "delivered");
        assert_eq!(stored.recipient, "1555");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replayed_callback_does_not_duplicate_synthetic_record() {
        let (db, _dir) = setup().await;
        let ws = WorkspaceId::from("W1");
        apply(&db, &ws, &status_event("wamid.ext", "delivered"))
            .await
            .unwrap();
        // Second delivery of the same callback hits tier 2 instead of
        // synthesizing again.
        apply(&db, &ws, &status_event("wamid.ext", "read")).await.unwrap();

        let stored = outbound::get_by_provider_id(&db, "wamid.ext")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "read");
        db.close().await.unwrap();
    }
}
