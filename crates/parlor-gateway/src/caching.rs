// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-path cache integration and write-path flushing.
//!
//! Cached read keys carry the caller role so admin and regular views never
//! share entries; admin moderation reads bypass the cache entirely. Every
//! write flushes the `{url, user, "last"}` scopes for its site.

use axum::Json;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::debug;

use parlor_cache::{FlusherRequest, Key};
use parlor_core::ParlorError;

use crate::error::ApiError;
use crate::server::AppState;

/// Scope name for site-wide listings (`last`, `list`).
pub const LAST_SCOPE: &str = "last";

/// Serve a read through the loading cache. The key is the request path and
/// query plus the caller role; `scopes` decide which writes invalidate it.
/// The loader future is only awaited on a cache miss.
pub async fn cached_json<T, F>(
    state: &AppState,
    site: &str,
    uri: &Uri,
    role: &str,
    scopes: Vec<String>,
    loader: F,
) -> Result<Response, ApiError>
where
    T: Serialize,
    F: Future<Output = Result<T, ParlorError>>,
{
    if role == "admin" {
        let value = loader.await?;
        return Ok(Json(value).into_response());
    }

    let id = format!("{role}:{uri}");
    let key = Key::new(id, site).with_scopes(scopes);
    let body = state
        .cache
        .get(&key, || async move {
            let value = loader.await?;
            serde_json::to_vec(&value).map_err(ParlorError::storage)
        })
        .await?;

    Ok((
        [("content-type", "application/json")],
        body.as_ref().clone(),
    )
        .into_response())
}

/// Invalidate everything a write to `(site, url)` by `user_id` can affect.
pub fn flush_write(state: &AppState, site: &str, url: &str, user_id: &str) {
    let req = FlusherRequest::new(site).with_scopes([url, user_id, LAST_SCOPE]);
    let flushed = state.cache.flush(&req);
    debug!(site, url, flushed, "cache flushed after write");
}

/// Invalidate the whole site (import, remap, user delete).
pub fn flush_site(state: &AppState, site: &str) {
    let flushed = state.cache.flush(&FlusherRequest::new(site));
    debug!(site, flushed, "site cache flushed");
}
