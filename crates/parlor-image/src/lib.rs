// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image and avatar storage for Parlor.
//!
//! Uploads go through a two-phase lifecycle: staged on upload, committed
//! when the referencing comment is written, swept from staging after a TTL.

pub mod avatar;
pub mod fs_store;
pub mod service;
pub mod sqlite_store;

pub use avatar::{FsAvatarStore, SqliteAvatarStore, avatar_id, migrate};
pub use fs_store::FsImageStore;
pub use service::{ImageLimits, ImageService, referenced_ids};
pub use sqlite_store::SqliteImageStore;
