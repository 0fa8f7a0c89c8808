// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! Each site gets its own database file. All writes are serialized through
//! tokio-rusqlite's single background thread; do NOT create additional
//! Connection instances for writes.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use parlor_core::ParlorError;

use crate::migrations;

/// A single site's database handle.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Open (creating if absent) the database at `path`, enable WAL mode,
    /// and run pending migrations.
    pub async fn open(path: &Path) -> Result<Database, ParlorError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ParlorError::storage)?;
        }

        let connection = Connection::open(path).await.map_err(|e| map_tr_err(e.into()))?;

        connection
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )?;
                migrations::run_migrations(conn)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(path = %path.display(), "database opened");
        Ok(Database { connection })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), ParlorError> {
        self.connection
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> ParlorError {
    ParlorError::Storage {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.db");
        let db = Database::open(&path).await.unwrap();
        assert!(path.exists());

        // Schema is queryable after migrations.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/site.db");
        Database::open(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.db");
        let db = Database::open(&path).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Second open re-runs the migration runner without error.
        let db = Database::open(&path).await.unwrap();
        db.close().await.unwrap();
    }
}
