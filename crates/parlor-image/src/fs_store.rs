// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem image store with partition fan-out.
//!
//! Items live under `<root>/<partition>/<id>` where the partition is derived
//! from a hash of the id; the staging area mirrors the same layout. Commit is
//! a rename from staging to the committed root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use parlor_core::{ImageStore, ParlorError};

pub struct FsImageStore {
    root: PathBuf,
    staging: PathBuf,
    partitions: u16,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, staging: impl Into<PathBuf>, partitions: u16) -> Self {
        Self {
            root: root.into(),
            staging: staging.into(),
            partitions: partitions.max(1),
        }
    }

    fn partition(&self, id: &str) -> String {
        let digest = Sha1::digest(id.as_bytes());
        format!("{:02x}", (digest[0] as u16) % self.partitions)
    }

    fn path_in(&self, base: &Path, id: &str) -> PathBuf {
        base.join(self.partition(id)).join(id)
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), ParlorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ParlorError::storage)?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(ParlorError::storage)
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, id: &str, data: &[u8]) -> Result<(), ParlorError> {
        write_file(&self.path_in(&self.staging, id), data).await
    }

    async fn commit(&self, id: &str) -> Result<(), ParlorError> {
        let from = self.path_in(&self.staging, id);
        let to = self.path_in(&self.root, id);
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ParlorError::storage)?;
        }
        match tokio::fs::rename(&from, &to).await {
            Ok(()) => Ok(()),
            // already committed earlier, e.g. the comment was edited
            Err(_) if tokio::fs::try_exists(&to).await.unwrap_or(false) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ParlorError::NotFound(format!("staging image {id}")))
            }
            Err(e) => Err(ParlorError::storage(e)),
        }
    }

    async fn load(&self, id: &str) -> Result<Vec<u8>, ParlorError> {
        for base in [&self.root, &self.staging] {
            let path = self.path_in(base, id);
            match tokio::fs::read(&path).await {
                Ok(data) => return Ok(data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ParlorError::storage(e)),
            }
        }
        Err(ParlorError::NotFound(format!("image {id}")))
    }

    async fn delete(&self, id: &str) -> Result<(), ParlorError> {
        let path = self.path_in(&self.root, id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ParlorError::NotFound(format!("image {id}")))
            }
            Err(e) => Err(ParlorError::storage(e)),
        }
    }

    async fn cleanup(&self, ttl: Duration) -> Result<usize, ParlorError> {
        let mut removed = 0;
        let mut partitions = match tokio::fs::read_dir(&self.staging).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ParlorError::storage(e)),
        };
        while let Some(partition) = partitions.next_entry().await.map_err(ParlorError::storage)? {
            let mut files = match tokio::fs::read_dir(partition.path()).await {
                Ok(dir) => dir,
                Err(_) => continue,
            };
            while let Some(file) = files.next_entry().await.map_err(ParlorError::storage)? {
                let stale = file
                    .metadata()
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|m| m.elapsed().ok())
                    .is_some_and(|age| age > ttl);
                if stale {
                    match tokio::fs::remove_file(file.path()).await {
                        Ok(()) => {
                            removed += 1;
                            debug!(path = %file.path().display(), "stale staging image removed");
                        }
                        Err(e) => warn!(path = %file.path().display(), error = %e, "cleanup failed"),
                    }
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &Path) -> FsImageStore {
        FsImageStore::new(dir.join("img"), dir.join("img-staging"), 100)
    }

    #[tokio::test]
    async fn staging_commit_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.save("pic-1", b"bytes").await.unwrap();
        // loadable while still staged
        assert_eq!(store.load("pic-1").await.unwrap(), b"bytes");

        store.commit("pic-1").await.unwrap();
        assert_eq!(store.load("pic-1").await.unwrap(), b"bytes");

        // committed path uses the partition fan-out
        let partition = store.partition("pic-1");
        assert!(dir.path().join("img").join(partition).join("pic-1").exists());
    }

    #[tokio::test]
    async fn commit_of_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.commit("ghost").await,
            Err(ParlorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn repeated_commit_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.save("pic-1", b"bytes").await.unwrap();
        store.commit("pic-1").await.unwrap();
        store.commit("pic-1").await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_staging() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.save("fresh", b"a").await.unwrap();
        store.save("committed", b"b").await.unwrap();
        store.commit("committed").await.unwrap();

        // nothing is older than an hour
        assert_eq!(store.cleanup(Duration::from_secs(3600)).await.unwrap(), 0);
        // zero ttl sweeps all staging, committed files survive
        let removed = store.cleanup(Duration::from_secs(0)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.load("committed").await.is_ok());
        assert!(store.load("fresh").await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_committed() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.save("pic", b"x").await.unwrap();
        store.commit("pic").await.unwrap();
        store.delete("pic").await.unwrap();
        assert!(matches!(
            store.load("pic").await,
            Err(ParlorError::NotFound(_))
        ));
    }
}
