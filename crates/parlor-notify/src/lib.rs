// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment notifications: a bounded in-process queue fanning out to
//! pluggable destinations.

pub mod destinations;
pub mod service;

pub use destinations::{LogDestination, WebhookDestination};
pub use service::NotifyService;
