// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation aggregates.
//!
//! One row per (workspace, phone number, contact), maintained by upsert so
//! the inbox view never needs to scan message tables. Writes run inside the
//! tenant scope; concurrent upserts for the same key are resolved by the
//! unique constraint plus `ON CONFLICT DO UPDATE`.

use rusqlite::params;
use tidings_core::TidingsError;

use crate::database::{map_tr_err, Database};
use crate::models::Conversation;
use crate::scope::TenantScope;

const COLUMNS: &str = "id, workspace_id, phone_number_id, contact, last_message, \
     last_message_at, unread_count, status, assigned_agent_id, created_at, updated_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        phone_number_id: row.get(2)?,
        contact: row.get(3)?,
        last_message: row.get(4)?,
        last_message_at: row.get(5)?,
        unread_count: row.get(6)?,
        status: row.get(7)?,
        assigned_agent_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Record an inbound message against its conversation: bump the preview,
/// advance `last_message_at`, and increment the unread counter.
pub async fn upsert_inbound(
    db: &Database,
    phone_number_id: &str,
    contact: &str,
    preview: &str,
    message_at: &str,
) -> Result<(), TidingsError> {
    let workspace_id = TenantScope::ambient().stamp(None)?;
    let phone_number_id = phone_number_id.to_string();
    let contact = contact.to_string();
    let preview = preview.to_string();
    let message_at = message_at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations
                     (workspace_id, phone_number_id, contact, last_message,
                      last_message_at, unread_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)
                 ON CONFLICT (workspace_id, phone_number_id, contact) DO UPDATE SET
                     last_message    = excluded.last_message,
                     last_message_at = excluded.last_message_at,
                     unread_count    = unread_count + 1,
                     updated_at      = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![workspace_id, phone_number_id, contact, preview, message_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a successful outbound send: bump the preview, advance
/// `last_message_at`, and clear the unread counter (the agent has seen
/// the thread by replying to it).
pub async fn upsert_outbound_success(
    db: &Database,
    phone_number_id: &str,
    contact: &str,
    preview: &str,
    message_at: &str,
) -> Result<(), TidingsError> {
    let workspace_id = TenantScope::ambient().stamp(None)?;
    let phone_number_id = phone_number_id.to_string();
    let contact = contact.to_string();
    let preview = preview.to_string();
    let message_at = message_at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations
                     (workspace_id, phone_number_id, contact, last_message,
                      last_message_at, unread_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)
                 ON CONFLICT (workspace_id, phone_number_id, contact) DO UPDATE SET
                     last_message    = excluded.last_message,
                     last_message_at = excluded.last_message_at,
                     unread_count    = 0,
                     updated_at      = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![workspace_id, phone_number_id, contact, preview, message_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed outbound send: the preview shows the failure, but the
/// unread counter is left untouched.
pub async fn update_preview_on_failure(
    db: &Database,
    phone_number_id: &str,
    contact: &str,
    preview: &str,
    message_at: &str,
) -> Result<(), TidingsError> {
    let workspace_id = TenantScope::ambient().stamp(None)?;
    let phone_number_id = phone_number_id.to_string();
    let contact = contact.to_string();
    let preview = preview.to_string();
    let message_at = message_at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations
                     (workspace_id, phone_number_id, contact, last_message,
                      last_message_at, unread_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)
                 ON CONFLICT (workspace_id, phone_number_id, contact) DO UPDATE SET
                     last_message    = excluded.last_message,
                     last_message_at = excluded.last_message_at,
                     updated_at      = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![workspace_id, phone_number_id, contact, preview, message_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single conversation within the active tenant.
pub async fn get(
    db: &Database,
    phone_number_id: &str,
    contact: &str,
) -> Result<Option<Conversation>, TidingsError> {
    let scope = TenantScope::ambient().param();
    let phone_number_id = phone_number_id.to_string();
    let contact = contact.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE (?1 IS NULL OR workspace_id = ?1)
                   AND phone_number_id = ?2 AND contact = ?3"
            ))?;
            let mut rows =
                stmt.query_map(params![scope, phone_number_id, contact], row_to_conversation)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Inbox listing for the active tenant, most recently active first.
pub async fn list_inbox(db: &Database, limit: i64) -> Result<Vec<Conversation>, TidingsError> {
    let scope = TenantScope::ambient().param();
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE (?1 IS NULL OR workspace_id = ?1)
                 ORDER BY last_message_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![scope, limit], row_to_conversation)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
