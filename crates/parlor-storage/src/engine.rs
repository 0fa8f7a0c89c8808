// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`Engine`] trait.
//!
//! One database file per site, all opened at startup and held for the
//! process lifetime. Requests for an unconfigured site fail with `NotFound`
//! rather than creating partitions on the fly.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use parlor_core::{
    BlockedUser, Comment, DeleteMode, Engine, Locator, ParlorError, PostInfo, SortField, SortKey,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage engine.
pub struct SqliteEngine {
    sites: HashMap<String, Database>,
}

impl SqliteEngine {
    /// Open one database per site under `dir`.
    pub async fn open(dir: &Path, sites: &[String]) -> Result<Self, ParlorError> {
        let mut map = HashMap::new();
        for site in sites {
            let path = dir.join(format!("{site}.db"));
            let db = Database::open(&path).await?;
            map.insert(site.clone(), db);
        }
        info!(sites = sites.len(), dir = %dir.display(), "storage engine opened");
        Ok(Self { sites: map })
    }

    fn db(&self, site: &str) -> Result<&Database, ParlorError> {
        self.sites
            .get(site)
            .ok_or_else(|| ParlorError::NotFound(format!("site {site}")))
    }

    /// Sites this engine serves.
    pub fn sites(&self) -> Vec<String> {
        self.sites.keys().cloned().collect()
    }
}

/// Order a flat comment list by the requested key. `active` orders by own
/// timestamp here; subtree activity is a tree-level concern.
pub fn sort_comments(comments: &mut [Comment], sort: SortKey) {
    match sort.field {
        SortField::Time | SortField::Active => {
            comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
        SortField::Score => {
            comments.sort_by(|a, b| {
                a.score
                    .cmp(&b.score)
                    .then_with(|| a.timestamp.cmp(&b.timestamp))
            });
        }
        SortField::Controversy => {
            comments.sort_by(|a, b| {
                a.controversy
                    .total_cmp(&b.controversy)
                    .then_with(|| a.timestamp.cmp(&b.timestamp))
            });
        }
    }
    if sort.desc {
        comments.reverse();
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    async fn create(&self, comment: Comment) -> Result<String, ParlorError> {
        let db = self.db(&comment.locator.site)?;
        let id = queries::comments::create(db, &comment).await?;
        debug!(site = %comment.locator.site, url = %comment.locator.url, id = %id, "comment created");
        Ok(id)
    }

    async fn get(&self, locator: &Locator, id: &str) -> Result<Comment, ParlorError> {
        queries::comments::get(self.db(&locator.site)?, &locator.url, id).await
    }

    async fn put(&self, locator: &Locator, comment: Comment) -> Result<(), ParlorError> {
        queries::comments::put(self.db(&locator.site)?, &comment).await
    }

    async fn find(&self, locator: &Locator, sort: SortKey) -> Result<Vec<Comment>, ParlorError> {
        let mut comments = queries::comments::find(self.db(&locator.site)?, &locator.url).await?;
        sort_comments(&mut comments, sort);
        Ok(comments)
    }

    async fn last(
        &self,
        site: &str,
        limit: usize,
        since: Option<DateTime<Utc>>,
        for_admin: bool,
    ) -> Result<Vec<Comment>, ParlorError> {
        queries::comments::last(self.db(site)?, limit, since, for_admin).await
    }

    async fn list(
        &self,
        site: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<PostInfo>, ParlorError> {
        queries::comments::list(self.db(site)?, limit, skip).await
    }

    async fn count(&self, locator: &Locator) -> Result<usize, ParlorError> {
        queries::comments::count(self.db(&locator.site)?, &locator.url).await
    }

    async fn info(&self, locator: &Locator) -> Result<PostInfo, ParlorError> {
        queries::comments::info(self.db(&locator.site)?, &locator.url).await
    }

    async fn delete(
        &self,
        locator: &Locator,
        id: &str,
        mode: DeleteMode,
    ) -> Result<(), ParlorError> {
        queries::comments::delete(self.db(&locator.site)?, &locator.url, id, mode).await
    }

    async fn delete_user(&self, site: &str, user_id: &str) -> Result<(), ParlorError> {
        let removed = queries::comments::delete_user(self.db(site)?, user_id).await?;
        info!(site, user_id, removed, "user comments deleted");
        Ok(())
    }

    async fn delete_all(&self, site: &str) -> Result<(), ParlorError> {
        queries::comments::delete_all(self.db(site)?).await
    }

    async fn set_read_only(&self, locator: &Locator, read_only: bool) -> Result<(), ParlorError> {
        queries::meta::set_read_only(self.db(&locator.site)?, &locator.url, read_only).await
    }

    async fn is_read_only(&self, locator: &Locator) -> Result<bool, ParlorError> {
        queries::meta::is_read_only(self.db(&locator.site)?, &locator.url).await
    }

    async fn set_verified(
        &self,
        site: &str,
        user_id: &str,
        verified: bool,
    ) -> Result<(), ParlorError> {
        queries::meta::set_verified(self.db(site)?, user_id, verified).await
    }

    async fn is_verified(&self, site: &str, user_id: &str) -> Result<bool, ParlorError> {
        queries::meta::is_verified(self.db(site)?, user_id).await
    }

    async fn verified(&self, site: &str) -> Result<Vec<String>, ParlorError> {
        queries::meta::verified(self.db(site)?).await
    }

    async fn set_blocked(
        &self,
        site: &str,
        user_id: &str,
        status: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), ParlorError> {
        queries::meta::set_blocked(self.db(site)?, user_id, status, until).await
    }

    async fn is_blocked(&self, site: &str, user_id: &str) -> Result<bool, ParlorError> {
        queries::meta::is_blocked(self.db(site)?, user_id).await
    }

    async fn blocked(&self, site: &str) -> Result<Vec<BlockedUser>, ParlorError> {
        queries::meta::blocked(self.db(site)?).await
    }

    async fn close(&self) -> Result<(), ParlorError> {
        for (site, db) in &self.sites {
            db.close().await?;
            debug!(site, "database closed");
        }
        Ok(())
    }
}
