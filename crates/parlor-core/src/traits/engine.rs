// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage engine trait: the narrow CRUD+scan contract over per-site partitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ParlorError;
use crate::types::{BlockedUser, Comment, DeleteMode, Locator, PostInfo, SortKey};

/// The persistent comment store.
///
/// Implementations hold one storage partition per site, opened at startup and
/// kept for the process lifetime. The engine never retries failed operations;
/// callers decide. A single `create` atomically updates the comment record,
/// the recency index, the per-user index, and the post info.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Store a new comment. Fails with [`ParlorError::Conflict`] when the id
    /// already exists in the locator, and with [`ParlorError::Validation`]
    /// when a non-empty parent id references a missing comment.
    async fn create(&self, comment: Comment) -> Result<String, ParlorError>;

    /// Fetch a single comment by locator and id.
    async fn get(&self, locator: &Locator, id: &str) -> Result<Comment, ParlorError>;

    /// Replace an existing comment. Fails with [`ParlorError::NotFound`]
    /// when the id is unknown.
    async fn put(&self, locator: &Locator, comment: Comment) -> Result<(), ParlorError>;

    /// All comments for a locator in the given order. `active` is sorted as
    /// `time` here; subtree activity is resolved during tree assembly.
    async fn find(&self, locator: &Locator, sort: SortKey) -> Result<Vec<Comment>, ParlorError>;

    /// Newest comments for a site, newest first. Comments from blocked users
    /// and deleted comments are hidden unless the requester is an admin.
    async fn last(
        &self,
        site: &str,
        limit: usize,
        since: Option<DateTime<Utc>>,
        for_admin: bool,
    ) -> Result<Vec<Comment>, ParlorError>;

    /// Commented pages for a site ordered by last activity, newest first.
    async fn list(&self, site: &str, limit: usize, skip: usize)
    -> Result<Vec<PostInfo>, ParlorError>;

    /// Number of non-deleted comments for a locator. Unknown urls count zero.
    async fn count(&self, locator: &Locator) -> Result<usize, ParlorError>;

    /// Aggregate info for one post.
    async fn info(&self, locator: &Locator) -> Result<PostInfo, ParlorError>;

    /// Delete one comment, either scrubbing it in place or removing it.
    async fn delete(
        &self,
        locator: &Locator,
        id: &str,
        mode: DeleteMode,
    ) -> Result<(), ParlorError>;

    /// Hard-delete every comment a user left on a site.
    async fn delete_user(&self, site: &str, user_id: &str) -> Result<(), ParlorError>;

    /// Drop every record for a site. Used by the importer before a restore.
    async fn delete_all(&self, site: &str) -> Result<(), ParlorError>;

    // --- Post flags ---

    async fn set_read_only(&self, locator: &Locator, read_only: bool) -> Result<(), ParlorError>;
    async fn is_read_only(&self, locator: &Locator) -> Result<bool, ParlorError>;

    // --- User flags ---

    async fn set_verified(&self, site: &str, user_id: &str, verified: bool)
    -> Result<(), ParlorError>;
    async fn is_verified(&self, site: &str, user_id: &str) -> Result<bool, ParlorError>;
    /// All verified user ids for a site.
    async fn verified(&self, site: &str) -> Result<Vec<String>, ParlorError>;

    /// Block or unblock a user. A `None` expiry blocks permanently
    /// (represented by a far-future timestamp).
    async fn set_blocked(
        &self,
        site: &str,
        user_id: &str,
        status: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), ParlorError>;
    /// Whether the user is blocked right now (expired blocks do not count).
    async fn is_blocked(&self, site: &str, user_id: &str) -> Result<bool, ParlorError>;
    /// All users whose block has not expired yet.
    async fn blocked(&self, site: &str) -> Result<Vec<BlockedUser>, ParlorError>;

    /// Flush and release the underlying partitions.
    async fn close(&self) -> Result<(), ParlorError>;
}
