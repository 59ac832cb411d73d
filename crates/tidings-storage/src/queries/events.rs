// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw webhook event log.
//!
//! Best-effort ingress record: the webhook ingress logs a failure here but
//! never fails the request over it.

use rusqlite::params;
use tidings_core::TidingsError;

use crate::database::{map_tr_err, Database};
use crate::scope::TenantScope;

/// Persist a raw webhook payload under the active tenant.
pub async fn insert_event(db: &Database, payload: &str) -> Result<i64, TidingsError> {
    let scope = TenantScope::ambient();
    let workspace_id = scope.stamp(None)?;
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO webhook_events (workspace_id, payload) VALUES (?1, ?2)",
                params![workspace_id, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Count raw events visible to the active tenant (all events when unscoped).
pub async fn count_events(db: &Database) -> Result<i64, TidingsError> {
    let scope = TenantScope::ambient().param();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM webhook_events
                 WHERE (?1 IS NULL OR workspace_id = ?1)",
                params![scope],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
