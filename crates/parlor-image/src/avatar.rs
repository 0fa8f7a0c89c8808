// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Avatar stores. Ids are content-addressed from the user id
//! (`<sha1(user_id)>.image`), so re-uploads overwrite in place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::params;
use sha1::{Digest, Sha1};
use tracing::{info, warn};

use parlor_core::{AvatarStore, ParlorError};

use crate::sqlite_store::map_db_err;

/// Derive the stored id for a user. Values that already carry the hashed
/// form pass through unchanged, which keeps migration id-stable.
pub fn avatar_id(user_id: &str) -> String {
    let trimmed = user_id.trim_end_matches(".image");
    if trimmed.len() == 40 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return format!("{trimmed}.image");
    }
    format!("{}.image", hex::encode(Sha1::digest(user_id.as_bytes())))
}

/// Flat-directory filesystem avatar store.
pub struct FsAvatarStore {
    path: PathBuf,
}

impl FsAvatarStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AvatarStore for FsAvatarStore {
    async fn put(&self, user_id: &str, data: &[u8]) -> Result<String, ParlorError> {
        let id = avatar_id(user_id);
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(ParlorError::storage)?;
        tokio::fs::write(self.path.join(&id), data)
            .await
            .map_err(ParlorError::storage)?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, ParlorError> {
        match tokio::fs::read(self.path.join(id)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ParlorError::NotFound(format!("avatar {id}")))
            }
            Err(e) => Err(ParlorError::storage(e)),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), ParlorError> {
        match tokio::fs::remove_file(self.path.join(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ParlorError::NotFound(format!("avatar {id}")))
            }
            Err(e) => Err(ParlorError::storage(e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, ParlorError> {
        let mut ids = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(ParlorError::storage(e)),
        };
        while let Some(entry) = dir.next_entry().await.map_err(ParlorError::storage)? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".image") {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// SQLite-backed avatar store.
pub struct SqliteAvatarStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteAvatarStore {
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
                "CREATE TABLE IF NOT EXISTS avatars (id TEXT PRIMARY KEY, data BLOB NOT NULL)",
            )?;
            Ok(())
        })
        .await
        .map_err(map_db_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl AvatarStore for SqliteAvatarStore {
    async fn put(&self, user_id: &str, data: &[u8]) -> Result<String, ParlorError> {
        let id = avatar_id(user_id);
        let key = id.clone();
        let data = data.to_vec();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO avatars (id, data) VALUES (?1, ?2)",
                    params![key, data],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_err)?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, ParlorError> {
        let key = id.to_string();
        let data = self
            .conn
            .call(move |conn| {
                let row: Option<Vec<u8>> = conn
                    .query_row(
                        "SELECT data FROM avatars WHERE id = ?1",
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
        data.ok_or_else(|| ParlorError::NotFound(format!("avatar {id}")))
    }

    async fn remove(&self, id: &str) -> Result<(), ParlorError> {
        let key = id.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute("DELETE FROM avatars WHERE id = ?1", params![key])?)
            })
            .await
            .map_err(map_db_err)?;
        if removed == 0 {
            return Err(ParlorError::NotFound(format!("avatar {id}")));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, ParlorError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM avatars ORDER BY id")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut ids = Vec::new();
                for id in rows {
                    ids.push(id?);
                }
                Ok(ids)
            })
            .await
            .map_err(map_db_err)
    }
}

/// Copy every avatar from one store to another; used by the `avatar` CLI
/// subcommand. Returns the number of migrated entries.
pub async fn migrate(
    from: &dyn AvatarStore,
    to: &dyn AvatarStore,
) -> Result<usize, ParlorError> {
    let ids = from.list().await?;
    let mut moved = 0;
    for id in &ids {
        match from.get(id).await {
            Ok(data) => {
                to.put(id, &data).await?;
                moved += 1;
            }
            Err(e) => warn!(id = %id, error = %e, "avatar skipped during migration"),
        }
    }
    info!(moved, total = ids.len(), "avatar migration done");
    Ok(moved)
}
