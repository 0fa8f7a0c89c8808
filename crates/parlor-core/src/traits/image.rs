// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend trait for the two-phase (staging, committed) image store.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ParlorError;

/// Raw persistence for proxied images.
///
/// Images land in a staging partition first and are moved to the committed
/// partition when the comment referencing them is written. Staging entries
/// older than the configured TTL are swept by the cleanup loop; committed
/// entries live until the referencing comment is hard-deleted.
#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    /// Write bytes to the staging partition under the given id.
    async fn save(&self, id: &str, data: &[u8]) -> Result<(), ParlorError>;

    /// Move an image from staging to the committed partition.
    async fn commit(&self, id: &str) -> Result<(), ParlorError>;

    /// Load image bytes, checking the committed partition first.
    async fn load(&self, id: &str) -> Result<Vec<u8>, ParlorError>;

    /// Remove a committed image (hard delete of the referencing comment).
    async fn delete(&self, id: &str) -> Result<(), ParlorError>;

    /// Sweep staging entries older than `ttl`; returns how many were removed.
    async fn cleanup(&self, ttl: Duration) -> Result<usize, ParlorError>;
}
