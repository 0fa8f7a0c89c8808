// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-addressed avatar artifact store.

use async_trait::async_trait;

use crate::error::ParlorError;

/// Storage for avatar images keyed by a content-derived id.
#[async_trait]
pub trait AvatarStore: Send + Sync + 'static {
    /// Store avatar bytes for a user; returns the content-addressed id.
    async fn put(&self, user_id: &str, data: &[u8]) -> Result<String, ParlorError>;

    /// Load avatar bytes by id.
    async fn get(&self, id: &str) -> Result<Vec<u8>, ParlorError>;

    /// Remove an avatar by id.
    async fn remove(&self, id: &str) -> Result<(), ParlorError>;

    /// All stored avatar ids. Used by the in-process migration command.
    async fn list(&self) -> Result<Vec<String>, ParlorError>;
}
