// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Parlor commenting service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the per-site [`SqliteEngine`]
//! implementing the storage contract from `parlor-core`.

pub mod database;
pub mod engine;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use engine::{SqliteEngine, sort_comments};
