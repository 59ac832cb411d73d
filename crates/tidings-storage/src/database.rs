// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use tidings_core::TidingsError;
use tracing::debug;

/// Connection pragmas applied on open. WAL keeps readers unblocked during
/// the single writer's transactions; busy_timeout covers the migration
/// window on first open.
const PRAGMAS: &str = "\
    PRAGMA journal_mode = WAL;\
    PRAGMA synchronous = NORMAL;\
    PRAGMA foreign_keys = ON;\
    PRAGMA busy_timeout = 5000;";

/// Pragmas for rollback-journal mode, used when `storage.wal_mode = false`.
const PRAGMAS_NO_WAL: &str = "\
    PRAGMA journal_mode = DELETE;\
    PRAGMA synchronous = FULL;\
    PRAGMA foreign_keys = ON;\
    PRAGMA busy_timeout = 5000;";

/// Handle to the SQLite database.
///
/// Wraps a single [`tokio_rusqlite::Connection`]; query modules accept
/// `&Database` and go through [`Database::connection`] + `call()`.
#[derive(Clone, Debug)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path` in WAL mode,
    /// apply pragmas, and run any pending migrations.
    pub async fn open(path: &str) -> Result<Self, TidingsError> {
        Self::open_with(path, true).await
    }

    /// Like [`Database::open`], but with an explicit journal mode choice.
    /// `wal_mode = false` falls back to rollback journaling, which some
    /// network filesystems require.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, TidingsError> {
        let pragmas = if wal_mode { PRAGMAS } else { PRAGMAS_NO_WAL };
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TidingsError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations run on a short-lived synchronous connection so refinery
        // errors stay out of the tokio-rusqlite call path.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), TidingsError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(map_sql_err)?;
            conn.execute_batch(pragmas).map_err(map_sql_err)?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| TidingsError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_sql_err)?;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(pragmas)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TidingsError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the crate error type, classifying
/// unique-constraint violations as [`TidingsError::DuplicateKey`].
pub fn map_tr_err(e: tokio_rusqlite::Error) -> TidingsError {
    match e {
        tokio_rusqlite::Error::Error(e) => map_sql_err(e),
        other => TidingsError::Storage {
            source: Box::new(other),
        },
    }
}

/// Map a rusqlite error, classifying unique-constraint violations.
///
/// Under at-least-once delivery a duplicate key on insert signals a webhook
/// re-delivery; callers match on [`TidingsError::DuplicateKey`] and treat it
/// as success.
pub fn map_sql_err(e: rusqlite::Error) -> TidingsError {
    if let rusqlite::Error::SqliteFailure(f, ref msg) = e
        && f.code == rusqlite::ErrorCode::ConstraintViolation
        && (f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    {
        return TidingsError::DuplicateKey {
            constraint: msg
                .clone()
                .unwrap_or_else(|| "unique constraint violated".to_string()),
        };
    }
    TidingsError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());

        // The migrated schema should contain the pipeline tables.
        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for expected in [
            "conversations",
            "inbound_messages",
            "outbound_messages",
            "queue",
            "webhook_events",
            "workspaces",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent_across_restarts() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        // Second open re-runs the migration runner, which must be a no-op.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[test]
    fn closed_connection_maps_to_storage_error() {
        let err = map_tr_err(tokio_rusqlite::Error::ConnectionClosed);
        assert!(matches!(err, TidingsError::Storage { .. }));
    }

    #[tokio::test]
    async fn rollback_journal_mode_is_usable() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nowal.db");
        let db = Database::open_with(db_path.to_str().unwrap(), false)
            .await
            .unwrap();
        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode, "delete");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_key_is_classified() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("dup.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let insert = |db: &Database| {
            let conn = db.connection().clone();
            async move {
                conn.call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute(
                        "INSERT INTO workspaces (id, name, phone_number_id, owner_id)
                         VALUES ('w1', 'acme', '123', 'o1')",
                        [],
                    )?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)
            }
        };

        insert(&db).await.unwrap();
        let err = insert(&db).await.unwrap_err();
        assert!(err.is_duplicate_key(), "got: {err}");

        db.close().await.unwrap();
    }
}
