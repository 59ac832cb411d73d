// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message records.

use rusqlite::params;
use tidings_core::TidingsError;

use crate::database::{map_tr_err, Database};
use crate::models::OutboundMessage;
use crate::scope::TenantScope;

const COLUMNS: &str = "id, workspace_id, phone_number_id, recipient, provider_message_id, \
     message_type, text_body, message_timestamp, status, error_reason, retry_count, \
     status_updated_at, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<OutboundMessage, rusqlite::Error> {
    Ok(OutboundMessage {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        phone_number_id: row.get(2)?,
        recipient: row.get(3)?,
        provider_message_id: row.get(4)?,
        message_type: row.get(5)?,
        text_body: row.get(6)?,
        message_timestamp: row.get(7)?,
        status: row.get(8)?,
        error_reason: row.get(9)?,
        retry_count: row.get(10)?,
        status_updated_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Persist an outbound record. The active tenant wins over the record's
/// own workspace id; the record value is the fallback for sends without
/// a resolved workspace.
pub async fn insert_outbound(db: &Database, msg: &OutboundMessage) -> Result<(), TidingsError> {
    let scope = TenantScope::ambient();
    let workspace_id = scope.stamp(Some(&msg.workspace_id))?;
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO outbound_messages
                     (id, workspace_id, phone_number_id, recipient, provider_message_id,
                      message_type, text_body, message_timestamp, status, error_reason,
                      retry_count, status_updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    msg.id,
                    workspace_id,
                    msg.phone_number_id,
                    msg.recipient,
                    msg.provider_message_id,
                    msg.message_type,
                    msg.text_body,
                    msg.message_timestamp,
                    msg.status,
                    msg.error_reason,
                    msg.retry_count,
                    msg.status_updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch an outbound record by provider message id, scoped when a tenant
/// context is active.
pub async fn get_by_provider_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<OutboundMessage>, TidingsError> {
    let scope = TenantScope::ambient().param();
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<OutboundMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM outbound_messages
                 WHERE provider_message_id = ?1
                   AND (?2 IS NULL OR workspace_id = ?2)"
            ))?;
            let mut rows = stmt.query_map(params![provider_message_id, scope], row_to_message)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a provider delivery status by provider message id. Unscoped:
/// status callbacks arrive without a resolved tenant.
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
                "UPDATE outbound_messages SET status = ?2, status_updated_at = ?3
                 WHERE provider_message_id = ?1",
                params![provider_message_id, status, status_at],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_tr_err)
}
