// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use kefu_core::KefuError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the relay's SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and apply migrations.
    pub async fn open(path: &str) -> Result<Self, KefuError> {
        Self::open_with(path, true).await
    }

    /// Open the database at `path`, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, KefuError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| KefuError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, KefuError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| KefuError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), KefuError> {
        let applied = self
            .conn
            .call(move |conn| -> Result<Result<usize, refinery::Error>, rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
                }
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
            .map_err(|e| KefuError::Storage {
                source: Box::new(e),
            })?;
        if applied > 0 {
            debug!(applied, "migrations applied");
        }
        Ok(())
    }

    /// The shared async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), KefuError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), KefuError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Wrap a tokio-rusqlite error as a storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> KefuError {
    KefuError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_enables_foreign_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kefu.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (tables, fk): (i64, i64) = db
            .connection()
            .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
                let tables = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('mini_apps', 'agents', 'assignments', 'users', 'messages')",
                    [],
                    |row| row.get(0),
                )?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((tables, fk))
            })
            .await
            .unwrap();
        assert_eq!(tables, 5);
        assert_eq!(fk, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kefu.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kefu.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_in_missing_directory_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("kefu.db");
        let err = Database::open(path.to_str().unwrap()).await.err().unwrap();
        assert!(matches!(err, KefuError::Storage { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn in_memory_database_has_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let users: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(users, 0);
    }
}
