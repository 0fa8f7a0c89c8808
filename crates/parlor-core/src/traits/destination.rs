// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink trait. Transports (email, telegram, ...) live outside
//! the core; anything implementing this trait can join the fan-out.

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::types::NotifyRequest;

/// A single notification destination.
#[async_trait]
pub trait Destination: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver one notification. Failures are logged by the fan-out worker
    /// and never stop delivery to the remaining destinations.
    async fn send(&self, request: &NotifyRequest) -> Result<(), ParlorError>;
}
