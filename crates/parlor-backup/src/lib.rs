// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled site backups: a native dump gzipped to
//! `<location>/backup-<site>-<yyyymmdd>.gz`, with a retention sweep keeping
//! the lexically newest files per site.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use parlor_core::ParlorError;
use parlor_service::DataService;

#[derive(Debug, Clone)]
pub struct BackupParams {
    pub location: PathBuf,
    pub interval: Duration,
    pub keep_max: usize,
}

impl Default for BackupParams {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./var/backup"),
            interval: Duration::from_secs(24 * 3600),
            keep_max: 10,
        }
    }
}

/// Per-site backup job. `start` runs it on the configured interval until
/// the token is cancelled; failures are logged and the schedule continues.
pub struct Backup {
    svc: Arc<DataService>,
    site: String,
    params: BackupParams,
}

impl Backup {
    pub fn new(svc: Arc<DataService>, site: impl Into<String>, params: BackupParams) -> Self {
        Self {
            svc,
            site: site.into(),
            params,
        }
    }

    /// Take one backup and sweep old files. Returns the written path.
    pub async fn once(&self) -> Result<PathBuf, ParlorError> {
        fs::create_dir_all(&self.params.location).map_err(ParlorError::storage)?;

        let mut dump = Vec::new();
        let written = parlor_migrator::export(&self.svc, &self.site, &mut dump).await?;

        let name = format!("backup-{}-{}.gz", self.site, Utc::now().format("%Y%m%d"));
        let path = self.params.location.join(&name);
        let file = File::create(&path).map_err(ParlorError::storage)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&dump).map_err(ParlorError::storage)?;
        encoder.finish().map_err(ParlorError::storage)?;

        let removed = self.cleanup()?;
        info!(site = %self.site, comments = written, path = %path.display(), removed, "backup written");
        Ok(path)
    }

    /// Drop this site's backup files beyond `keep_max`, newest names kept.
    /// Other sites' files in the same directory are untouched.
    pub fn cleanup(&self) -> Result<usize, ParlorError> {
        let prefix = format!("backup-{}-", self.site);
        let mut names: Vec<String> = fs::read_dir(&self.params.location)
            .map_err(ParlorError::storage)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".gz"))
            .collect();
        // date-stamped names sort chronologically
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = 0;
        for name in names.iter().skip(self.params.keep_max) {
            let path = self.params.location.join(name);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "stale backup not removed"),
            }
        }
        Ok(removed)
    }

    /// Run the backup on its interval until cancelled.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.params.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(site = %self.site, "backup schedule stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.once().await {
                            error!(site = %self.site, error = %e, "backup failed");
                        }
                    }
                }
            }
        })
    }
}

/// Load a gzipped native dump back into `site`, replacing its content.
pub async fn restore(
    svc: &DataService,
    site: &str,
    path: &std::path::Path,
    cancel: &CancellationToken,
) -> Result<usize, ParlorError> {
    let file = File::open(path).map_err(ParlorError::storage)?;
    let reader = BufReader::new(GzDecoder::new(file));
    let saved = parlor_migrator::import(svc, site, reader, cancel).await?;
    info!(site, saved, path = %path.display(), "restore finished");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;
    use tempfile::TempDir;

    use parlor_core::{Comment, Locator, SortKey, User};
    use parlor_service::{
        CommentFormatter, RestrictedWordsMatcher, ServiceParams, StaticAdminStore,
        StaticWordLister,
    };
    use parlor_storage::SqliteEngine;

    async fn new_service(site: &str) -> (Arc<DataService>, TempDir) {
        let dir = TempDir::new().unwrap();
        let engine = SqliteEngine::open(dir.path(), &[site.to_string()])
            .await
            .unwrap();
        let admin = StaticAdminStore::new(
            "secret".into(),
            vec![],
            String::new(),
            vec![site.to_string()],
        );
        let svc = DataService::new(
            Arc::new(engine),
            Arc::new(admin),
            CommentFormatter::new(None).unwrap(),
            RestrictedWordsMatcher::new(Arc::new(StaticWordLister::new(vec![]))),
            None,
            ServiceParams::default(),
        );
        (Arc::new(svc), dir)
    }

    fn comment(id: &str, url: &str, secs: i64) -> Comment {
        Comment {
            id: id.into(),
            text: format!("<p>{id}</p>"),
            orig: id.to_string(),
            user: User {
                id: "u1".into(),
                name: "user one".into(),
                ..User::default()
            },
            locator: Locator::new("site-1", url),
            timestamp: DateTime::from_timestamp(1_600_000_000 + secs, 0).unwrap(),
            ..Comment::default()
        }
    }

    #[tokio::test]
    async fn backup_and_restore_round_trip() {
        let (svc, _db_dir) = new_service("site-1").await;
        svc.engine()
            .create(comment("c1", "https://example.com/p1", 1))
            .await
            .unwrap();
        svc.engine()
            .create(comment("c2", "https://example.com/p1", 2))
            .await
            .unwrap();

        let out = TempDir::new().unwrap();
        let backup = Backup::new(
            svc.clone(),
            "site-1",
            BackupParams {
                location: out.path().to_path_buf(),
                ..BackupParams::default()
            },
        );
        let path = backup.once().await.unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("backup-site-1-"));

        let (fresh, _db_dir2) = new_service("site-1").await;
        let saved = restore(&fresh, "site-1", &path, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(saved, 2);

        let restored = fresh
            .engine()
            .find(
                &Locator::new("site-1", "https://example.com/p1"),
                SortKey::default(),
            )
            .await
            .unwrap();
        assert_eq!(restored.len(), 2);
    }

    #[tokio::test]
    async fn cleanup_keeps_newest_per_site() {
        let (svc, _db_dir) = new_service("site-1").await;
        let out = TempDir::new().unwrap();

        for day in 1..=10 {
            let name = format!("backup-site-1-202601{day:02}.gz");
            fs::write(out.path().join(name), b"x").unwrap();
        }
        fs::write(out.path().join("backup-site-2-20260101.gz"), b"x").unwrap();

        let backup = Backup::new(
            svc,
            "site-1",
            BackupParams {
                location: out.path().to_path_buf(),
                keep_max: 3,
                ..BackupParams::default()
            },
        );
        let removed = backup.cleanup().unwrap();
        assert_eq!(removed, 7);

        let mut left: Vec<String> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "backup-site-1-20260108.gz",
                "backup-site-1-20260109.gz",
                "backup-site-1-20260110.gz",
                "backup-site-2-20260101.gz",
            ]
        );
    }
}
