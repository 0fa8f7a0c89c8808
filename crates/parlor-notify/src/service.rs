// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification queue and fan-out worker.
//!
//! `submit` never blocks the write path: the queue is bounded and overflow
//! drops the oldest pending entry with a warning. A single worker drains the
//! queue and delivers each request to every destination; one failing
//! destination never stops the others.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use parlor_core::{Destination, NotifyRequest};

pub struct NotifyService {
    queue: Mutex<VecDeque<NotifyRequest>>,
    wakeup: Notify,
    capacity: usize,
}

impl NotifyService {
    /// Start the fan-out worker; it runs until `token` is cancelled.
    pub fn start(
        destinations: Vec<Arc<dyn Destination>>,
        capacity: usize,
        token: CancellationToken,
    ) -> Arc<Self> {
        let service = Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            capacity: capacity.max(1),
        });
        let worker = Arc::clone(&service);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = worker.wakeup.notified() => {}
                }
                while let Some(request) = worker.pop() {
                    for dest in &destinations {
                        if let Err(e) = dest.send(&request).await {
                            warn!(
                                destination = dest.name(),
                                comment = %request.comment.id,
                                error = %e,
                                "notification delivery failed"
                            );
                        }
                    }
                }
            }
            debug!("notify worker stopped");
        });
        service
    }

    /// Enqueue a notification. Never blocks; over capacity the oldest
    /// pending entry is dropped.
    pub fn submit(&self, request: NotifyRequest) {
        {
            let mut queue = self.lock();
            if queue.len() >= self.capacity {
                if let Some(dropped) = queue.pop_front() {
                    warn!(comment = %dropped.comment.id, "notification queue full, oldest dropped");
                }
            }
            queue.push_back(request);
        }
        self.wakeup.notify_one();
    }

    /// Pending entries, for observability.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn pop(&self) -> Option<NotifyRequest> {
        self.lock().pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<NotifyRequest>> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
