// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache invalidation bus. Multi-process deployments publish flush events so
//! sibling instances can evict the same scopes. At-most-once delivery is
//! acceptable; a missed invalidation falls back to the entry TTL.

use async_trait::async_trait;

use crate::error::ParlorError;

/// Callback invoked for every received flush event as `(from_id, scopes)`.
pub type BusHandler = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Pub/sub transport for cache flush events.
#[async_trait]
pub trait CacheBus: Send + Sync + 'static {
    /// Publish a flush event. `scopes` is the serialized scope string.
    async fn publish(&self, from_id: &str, scopes: &str) -> Result<(), ParlorError>;

    /// Register a handler for incoming events. Handlers receive events from
    /// every publisher, including this instance; filtering by id is the
    /// subscriber's job.
    async fn subscribe(&self, handler: BusHandler) -> Result<(), ParlorError>;
}
