// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-site administrative record: secret key, admin ids, contact email.

use async_trait::async_trait;

use crate::error::ParlorError;

/// Source of per-site administrative data.
///
/// The secret key is consulted on every write path (IP hashing, token
/// verification); callers should fetch it once per request scope rather than
/// per field to avoid repeated round-trips on the remote variant.
#[async_trait]
pub trait AdminStore: Send + Sync + 'static {
    /// The site's secret key used for HMAC hashing and token signatures.
    async fn key(&self, site: &str) -> Result<String, ParlorError>;

    /// User ids with admin capability on the site.
    async fn admins(&self, site: &str) -> Result<Vec<String>, ParlorError>;

    /// Moderation contact address for the site.
    async fn email(&self, site: &str) -> Result<String, ParlorError>;

    /// Whether the site accepts requests at all.
    async fn enabled(&self, site: &str) -> Result<bool, ParlorError>;
}
