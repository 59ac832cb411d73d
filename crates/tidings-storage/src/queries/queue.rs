// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable at-least-once work queue on SQLite.
//!
//! Dequeue claims the oldest pending entry inside a transaction, flips it
//! to `processing`, and sets a lock deadline. Entries whose worker died
//! past the deadline are reclaimed back to `pending`. An entry that fails
//! at `max_attempts` goes to the terminal `dead` state instead.

use rusqlite::{params, OptionalExtension};
use tidings_core::TidingsError;

use crate::database::{map_tr_err, Database};
use crate::models::QueueEntry;

/// Claim lock duration. A worker that holds an entry longer than this is
/// presumed dead and the entry becomes reclaimable.
const LOCK_SECONDS: i64 = 300;

const COLUMNS: &str =
    "id, queue_name, payload, status, attempts, max_attempts, created_at, updated_at, locked_until";

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        locked_until: row.get(8)?,
    })
}

/// Append a payload to the named queue.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: i64,
) -> Result<i64, TidingsError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, max_attempts)
                 VALUES (?1, ?2, ?3)",
                params![queue_name, payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the oldest pending entry, if any.
///
/// The claim is transactional: the select and the `processing` flip are one
/// unit, so two pollers can never claim the same entry. The attempt counter
/// is incremented at claim time.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, TidingsError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let entry = tx
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM queue
                         WHERE queue_name = ?1 AND status = 'pending'
                         ORDER BY id LIMIT 1"
                    ),
                    params![queue_name],
                    row_to_entry,
                )
                .optional()?;
            let Some(mut entry) = entry else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE queue SET
                     status       = 'processing',
                     attempts     = attempts + 1,
                     locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2 || ' seconds'),
                     updated_at   = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![entry.id, LOCK_SECONDS],
            )?;
            tx.commit()?;
            entry.status = "processing".to_string();
            entry.attempts += 1;
            Ok(Some(entry))
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a claimed entry as successfully processed.
pub async fn ack(db: &Database, id: i64) -> Result<(), TidingsError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE queue SET
                     status       = 'completed',
                     locked_until = NULL,
                     updated_at   = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Release a claimed entry after a handler failure.
///
/// The entry goes back to `pending` for redelivery unless it has exhausted
/// its attempts, in which case it is dead-lettered. Returns `true` when the
/// entry was dead-lettered.
pub async fn fail(db: &Database, id: i64) -> Result<bool, TidingsError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let dead = tx.execute(
                "UPDATE queue SET
                     status       = 'dead',
                     locked_until = NULL,
                     updated_at   = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND attempts >= max_attempts",
                params![id],
            )?;
            if dead == 0 {
                tx.execute(
                    "UPDATE queue SET
                         status       = 'pending',
                         locked_until = NULL,
                         updated_at   = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![id],
                )?;
            }
            tx.commit()?;
            Ok(dead > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Return entries whose claim lock has expired to `pending`.
///
/// Run periodically by the worker loop; covers workers that crashed while
/// holding a claim. Returns the number of reclaimed entries.
pub async fn reclaim_expired(db: &Database, queue_name: &str) -> Result<usize, TidingsError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE queue SET
                     status       = 'pending',
                     locked_until = NULL,
                     updated_at   = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![queue_name],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Dead-lettered entries for the named queue, oldest first.
pub async fn dead_letters(db: &Database, queue_name: &str) -> Result<Vec<QueueEntry>, TidingsError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM queue
                 WHERE queue_name = ?1 AND status = 'dead'
                 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![queue_name], row_to_entry)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
