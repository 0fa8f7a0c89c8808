// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite KV backend for the image store. One table, a `staged` flag and a
//! creation timestamp for the staging sweep.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::params;

use parlor_core::{ImageStore, ParlorError};

pub(crate) fn map_db_err(e: tokio_rusqlite::Error) -> ParlorError {
    ParlorError::Storage { source: Box::new(e) }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct SqliteImageStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteImageStore {
    pub async fn open(path: &Path) -> Result<Self, ParlorError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ParlorError::storage)?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_db_err(e.into()))?;
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS images (
                     id TEXT PRIMARY KEY,
                     staged INTEGER NOT NULL,
                     created_ts INTEGER NOT NULL,
                     data BLOB NOT NULL
                 )",
            )?;
            Ok(())
        })
        .await
        .map_err(map_db_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn save(&self, id: &str, data: &[u8]) -> Result<(), ParlorError> {
        let id = id.to_string();
        let data = data.to_vec();
        let ts = now_secs();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO images (id, staged, created_ts, data)
                     VALUES (?1, 1, ?2, ?3)",
                    params![id, ts, data],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_err)
    }

    async fn commit(&self, id: &str) -> Result<(), ParlorError> {
        let id = id.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                Ok(conn.execute("UPDATE images SET staged = 0 WHERE id = ?1", params![id])?)
            })
            .await
            .map_err(map_db_err)?;
        if updated == 0 {
            return Err(ParlorError::NotFound("staging image".into()));
        }
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Vec<u8>, ParlorError> {
        let key = id.to_string();
        let data = self
            .conn
            .call(move |conn| {
                let row: Option<Vec<u8>> = conn
                    .query_row(
                        "SELECT data FROM images WHERE id = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(row)
            })
            .await
            .map_err(map_db_err)?;
        data.ok_or_else(|| ParlorError::NotFound(format!("image {id}")))
    }

    async fn delete(&self, id: &str) -> Result<(), ParlorError> {
        let key = id.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM images WHERE id = ?1 AND staged = 0",
                    params![key],
                )?)
            })
            .await
            .map_err(map_db_err)?;
        if removed == 0 {
            return Err(ParlorError::NotFound(format!("image {id}")));
        }
        Ok(())
    }

    async fn cleanup(&self, ttl: Duration) -> Result<usize, ParlorError> {
        let cutoff = now_secs() - ttl.as_secs() as i64;
        self.conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM images WHERE staged = 1 AND created_ts <= ?1",
                    params![cutoff],
                )?)
            })
            .await
            .map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn staging_lifecycle() {
        let dir = tempdir().unwrap();
        let store = SqliteImageStore::open(&dir.path().join("images.db"))
            .await
            .unwrap();

        store.save("a", b"bytes").await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), b"bytes");

        store.commit("a").await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), b"bytes");

        // staged-only entries are swept, committed survive
        store.save("stale", b"x").await.unwrap();
        let removed = store.cleanup(Duration::from_secs(0)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.load("a").await.is_ok());
        assert!(store.load("stale").await.is_err());
    }

    #[tokio::test]
    async fn delete_only_touches_committed() {
        let dir = tempdir().unwrap();
        let store = SqliteImageStore::open(&dir.path().join("images.db"))
            .await
            .unwrap();
        store.save("staged", b"x").await.unwrap();
        assert!(matches!(
            store.delete("staged").await,
            Err(ParlorError::NotFound(_))
        ));

        store.commit("staged").await.unwrap();
        store.delete("staged").await.unwrap();
        assert!(store.load("staged").await.is_err());
    }
}
