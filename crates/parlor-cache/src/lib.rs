// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading cache for rendered API responses.
//!
//! Read handlers cache serialized payloads under scoped keys; every write
//! path flushes the scopes it may have touched. An optional bus propagates
//! flushes across instances.

pub mod bus;
pub mod key;
pub mod loading;

pub use bus::BroadcastBus;
pub use key::{FlusherRequest, Key};
pub use loading::{CacheOptions, CommentCache, LoadingCache};
