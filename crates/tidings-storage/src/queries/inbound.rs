// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message records.

use rusqlite::params;
use tidings_core::TidingsError;

use crate::database::{map_tr_err, Database};
use crate::models::InboundMessage;
use crate::scope::TenantScope;

const COLUMNS: &str = "id, workspace_id, phone_number_id, contact, sender_name, \
     provider_message_id, message_type, text_body, media_id, message_timestamp, \
     status, status_updated_at, raw_payload, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<InboundMessage, rusqlite::Error> {
    Ok(InboundMessage {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        phone_number_id: row.get(2)?,
        contact: row.get(3)?,
        sender_name: row.get(4)?,
        provider_message_id: row.get(5)?,
        message_type: row.get(6)?,
        text_body: row.get(7)?,
        media_id: row.get(8)?,
        message_timestamp: row.get(9)?,
        status: row.get(10)?,
        status_updated_at: row.get(11)?,
        raw_payload: row.get(12)?,
        created_at: row.get(13)?,
    })
}

/// Insert an inbound message, stamped with the active tenant.
///
/// Returns [`TidingsError::DuplicateKey`] when the provider message id was
/// already stored; under at-least-once delivery the caller treats that as a
/// re-delivery and skips the conversation update.
pub async fn insert_inbound(db: &Database, msg: &InboundMessage) -> Result<(), TidingsError> {
    let scope = TenantScope::ambient();
    let workspace_id = scope.stamp(Some(&msg.workspace_id))?;
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO inbound_messages
                     (id, workspace_id, phone_number_id, contact, sender_name,
                      provider_message_id, message_type, text_body, media_id,
                      message_timestamp, raw_payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    msg.id,
                    workspace_id,
                    msg.phone_number_id,
                    msg.contact,
                    msg.sender_name,
                    msg.provider_message_id,
                    msg.message_type,
                    msg.text_body,
                    msg.media_id,
                    msg.message_timestamp,
                    msg.raw_payload,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch an inbound message by provider message id, scoped to the active
/// tenant when a context is active.
pub async fn get_by_provider_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<InboundMessage>, TidingsError> {
    let scope = TenantScope::ambient().param();
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<InboundMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM inbound_messages
                 WHERE provider_message_id = ?1
                   AND (?2 IS NULL OR workspace_id = ?2)"
            ))?;
            let mut rows = stmt.query_map(params![provider_message_id, scope], row_to_message)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Per-contact message history within the active tenant, newest first.
pub async fn list_for_contact(
    db: &Database,
    contact: &str,
    limit: i64,
) -> Result<Vec<InboundMessage>, TidingsError> {
    let scope = TenantScope::ambient().param();
    let contact = contact.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<InboundMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM inbound_messages
                 WHERE (?1 IS NULL OR workspace_id = ?1) AND contact = ?2
                 ORDER BY created_at DESC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![scope, contact, limit], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a provider delivery status to an inbound record by provider
/// message id. Unscoped: status callbacks are matched across tenants.
///
/// Returns `true` when a record was updated.
pub async fn apply_status(
    db: &Database,
    provider_message_id: &str,
    status: &str,
    status_at: &str,
) -> Result<bool, TidingsError> {
    let provider_message_id = provider_message_id.to_string();
    let status = status.to_string();
    let status_at = status_at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let updated = conn.execute(
                "UPDATE inbound_messages SET status = ?2, status_updated_at = ?3
                 WHERE provider_message_id = ?1",
                params![provider_message_id, status, status_at],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_tr_err)
}
