// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST gateway for the Parlor commenting service.
//!
//! Public reads are served through the loading cache, writes require a
//! signed bearer token or the basic admin account, and every write flushes
//! the cache scopes it can affect.

pub mod auth;
pub mod caching;
pub mod error;
pub mod handlers;
pub mod rate;
pub mod server;

pub use auth::{AuthConfig, Claims, sign_claims};
pub use error::ApiError;
pub use rate::RateLimiter;
pub use server::{AppState, build_router, start_server};
