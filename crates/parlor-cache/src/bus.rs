// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process invalidation bus backed by a tokio broadcast channel.
//!
//! Events are single strings `<from_id>$<scopes>`. Every subscriber sees
//! every event, including its own; the instance id filter lives in the
//! handler wiring, not here.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use parlor_core::{BusHandler, CacheBus, ParlorError};

const ID_SEP: char = '$';

/// Broadcast-channel bus for single-process deployments and tests.
pub struct BroadcastBus {
    tx: broadcast::Sender<String>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl CacheBus for BroadcastBus {
    async fn publish(&self, from_id: &str, scopes: &str) -> Result<(), ParlorError> {
        // No receivers is fine, single-instance deployments run without any.
        let _ = self.tx.send(format!("{from_id}{ID_SEP}{scopes}"));
        Ok(())
    }

    async fn subscribe(&self, handler: BusHandler) -> Result<(), ParlorError> {
        let mut rx = self.tx.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match event.split_once(ID_SEP) {
                        Some((from_id, scopes)) => handler(from_id, scopes),
                        None => debug!(%event, "malformed bus event dropped"),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bus subscriber lagged, flushes missed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(())
    }
}
