// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workspace lookup and provisioning.
//!
//! These queries are deliberately unscoped: the workspace resolver runs
//! before any tenant context exists (it is what establishes one), and
//! provisioning happens at onboarding, outside the pipeline.

use rusqlite::params;
use tidings_core::TidingsError;

use crate::database::{map_tr_err, Database};
use crate::models::Workspace;

/// Provision a workspace. `phone_number_id` and `name` are unique.
pub async fn insert_workspace(db: &Database, workspace: &Workspace) -> Result<(), TidingsError> {
    let ws = workspace.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO workspaces (id, name, phone_number_id, owner_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![ws.id, ws.name, ws.phone_number_id, ws.owner_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve a workspace from the provider-assigned phone-number id.
pub async fn find_by_phone_number_id(
    db: &Database,
    phone_number_id: &str,
) -> Result<Option<Workspace>, TidingsError> {
    let phone_number_id = phone_number_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Workspace>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, name, phone_number_id, owner_id, created_at
                 FROM workspaces WHERE phone_number_id = ?1",
            )?;
            let mut rows = stmt.query_map(params![phone_number_id], |row| {
                Ok(Workspace {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone_number_id: row.get(2)?,
                    owner_id: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}
