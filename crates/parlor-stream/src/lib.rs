// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-poll stream engine.
//!
//! Each subscription runs its own poller task calling `Engine::last` at the
//! refresh interval and pushing new comments, timestamp ascending, into a
//! bounded channel. A global atomic counter caps concurrent subscriptions;
//! idle streams close after the inactivity timeout; dropping the
//! subscription cancels the poller immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use parlor_core::{Comment, Engine, ParlorError};

const POLL_BATCH: usize = 100;
const CHANNEL_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct StreamParams {
    pub refresh: Duration,
    pub inactivity_timeout: Duration,
    pub max_active: usize,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(5),
            inactivity_timeout: Duration::from_secs(15 * 60),
            max_active: 500,
        }
    }
}

/// One live stream. Dropping it cancels the poller and releases the slot.
pub struct Subscription {
    rx: mpsc::Receiver<Vec<Comment>>,
    _guard: DropGuard,
}

impl Subscription {
    /// Next batch of new comments; `None` when the stream has closed.
    pub async fn recv(&mut self) -> Option<Vec<Comment>> {
        self.rx.recv().await
    }
}

pub struct Streamer {
    engine: Arc<dyn Engine>,
    params: StreamParams,
    active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl Streamer {
    pub fn new(engine: Arc<dyn Engine>, params: StreamParams, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            params,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown,
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Open a stream of new comments for a site. `last_known` lets a client
    /// catch up from its last seen timestamp; without it only comments newer
    /// than the subscription are delivered.
    pub fn subscribe(
        &self,
        site: &str,
        last_known: Option<DateTime<Utc>>,
    ) -> Result<Subscription, ParlorError> {
        // admission by atomic counter, first-come first-served
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.params.max_active {
                return Err(ParlorError::RateLimited);
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(seen) => current = seen,
            }
        }

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();

        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active);
        let params = self.params.clone();
        let site = site.to_string();
        let mut since = last_known.unwrap_or_else(Utc::now);

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(params.refresh);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_emit = Instant::now();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {}
                }
                if last_emit.elapsed() > params.inactivity_timeout {
                    debug!(site, "stream closed after inactivity");
                    break;
                }
                let mut batch = match engine.last(&site, POLL_BATCH, Some(since), false).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(site, error = %e, "stream poll failed");
                        continue;
                    }
                };
                if batch.is_empty() {
                    continue;
                }
                // engine returns newest first
                batch.reverse();
                if let Some(newest) = batch.last() {
                    since = since.max(newest.timestamp);
                }
                if tx.send(batch).await.is_err() {
                    break; // client gone
                }
                last_emit = Instant::now();
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });

        Ok(Subscription { rx, _guard: guard })
    }
}
