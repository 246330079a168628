// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use murmur_core::MurmurError;
use tracing::debug;

use crate::migrations;

/// Per-connection settings. `journal_mode` is applied once at open because
/// it persists in the database file.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;";

/// Handle to the SQLite database. Cheap to clone; clones share the writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, MurmurError> {
        Self::open_with(path, true).await
    }

    /// Like [`Database::open`], with explicit control over write-ahead logging.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, MurmurError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(MurmurError::storage)?;
        }

        // Migrations run on a short-lived synchronous connection so refinery
        // errors keep their own type.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), MurmurError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(MurmurError::storage)?;
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.execute_batch(&format!("PRAGMA journal_mode = {journal};"))
                .map_err(MurmurError::storage)?;
            conn.execute_batch(CONNECTION_PRAGMAS)
                .map_err(MurmurError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| MurmurError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(MurmurError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The shared async connection. All query modules go through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the writer thread. Later calls on any
    /// clone fail with a storage error.
    pub async fn close(&self) -> Result<(), MurmurError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.clone().close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Maps a tokio-rusqlite failure into [`MurmurError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MurmurError {
    MurmurError::Storage {
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
        let path = dir.path().join("nested/dir/test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (tables, fk): (i64, i64) = db
            .connection()
            .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
                let tables = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('users', 'chatrooms', 'messages', 'daily_usage', 'queue')",
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
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let path = path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn calls_after_close_fail() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        db.close().await.unwrap();

        let result = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        assert!(result.is_err());
    }
}
