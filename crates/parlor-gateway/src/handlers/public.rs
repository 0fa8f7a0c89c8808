// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Public read routes: comment listings, counts, post index and the
//! long-poll stream.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use parlor_core::{Locator, SortKey};

use crate::auth::AuthInfo;
use crate::caching::{LAST_SCOPE, cached_json};
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub site: String,
    pub url: String,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub format: String,
}

/// GET /api/v1/find: flat or threaded listing for one post.
pub async fn find(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    uri: Uri,
    Query(q): Query<FindQuery>,
) -> Result<Response, ApiError> {
    let locator = Locator::new(&q.site, &q.url);
    let sort = SortKey::parse(&q.sort);
    let svc = state.svc.clone();
    let tree = q.format == "tree";

    cached_json(
        &state,
        &q.site,
        &uri,
        auth.role(),
        vec![q.url.clone()],
        async move {
            if tree {
                let nodes = svc.tree(&locator, sort).await?;
                Ok(json!({ "comments": nodes }))
            } else {
                let comments = svc.find(&locator, sort).await?;
                Ok(json!({ "comments": comments }))
            }
        },
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct SiteQuery {
    pub site: String,
}

/// GET /api/v1/last/{max}: newest comments across the site, admins see
/// blocked users' comments too.
pub async fn last(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    uri: Uri,
    Path(max): Path<usize>,
    Query(q): Query<SiteQuery>,
) -> Result<Response, ApiError> {
    let svc = state.svc.clone();
    let site = q.site.clone();
    let for_admin = auth.role() == "admin";

    cached_json(
        &state,
        &q.site,
        &uri,
        auth.role(),
        vec![LAST_SCOPE.to_string()],
        async move { svc.engine().last(&site, max, None, for_admin).await },
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub site: String,
    pub url: String,
}

/// GET /api/v1/id/{id}: one comment.
pub async fn by_id(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    uri: Uri,
    Path(id): Path<String>,
    Query(q): Query<IdQuery>,
) -> Result<Response, ApiError> {
    let svc = state.svc.clone();
    let locator = Locator::new(&q.site, &q.url);

    cached_json(
        &state,
        &q.site,
        &uri,
        auth.role(),
        vec![q.url.clone()],
        async move { svc.engine().get(&locator, &id).await },
    )
    .await
}

/// GET /api/v1/count: non-deleted count for one post.
pub async fn count(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    uri: Uri,
    Query(q): Query<IdQuery>,
) -> Result<Response, ApiError> {
    let svc = state.svc.clone();
    let locator = Locator::new(&q.site, &q.url);

    cached_json(
        &state,
        &q.site,
        &uri,
        auth.role(),
        vec![q.url.clone()],
        async move {
            let count = svc.engine().count(&locator).await?;
            Ok(json!({ "count": count }))
        },
    )
    .await
}

/// POST /api/v1/counts: counts for a batch of URLs; unknown URLs come back
/// with a zero count.
pub async fn counts(
    State(state): State<AppState>,
    Query(q): Query<SiteQuery>,
    Json(urls): Json<Vec<String>>,
) -> Result<Response, ApiError> {
    let infos = state.svc.counts(&q.site, &urls).await?;
    Ok(Json(infos).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub site: String,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

/// GET /api/v1/list: posts ordered by last activity.
pub async fn list(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    uri: Uri,
    Query(q): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let svc = state.svc.clone();
    let site = q.site.clone();

    cached_json(
        &state,
        &q.site,
        &uri,
        auth.role(),
        vec![LAST_SCOPE.to_string()],
        async move { svc.engine().list(&site, q.limit, q.skip).await },
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub site: String,
    #[serde(default)]
    pub since: String,
}

/// GET /api/v1/stream/last: long poll for new comments. Returns the first
/// batch seen after `since`, or an empty list when the subscription closes
/// on inactivity. Never cached.
pub async fn stream_last(
    State(state): State<AppState>,
    Query(q): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let since = parse_since(&q.since);
    let mut sub = state.streamer.subscribe(&q.site, since)?;
    match sub.recv().await {
        Some(batch) => Ok(Json(batch).into_response()),
        None => Ok(Json(Vec::<parlor_core::Comment>::new()).into_response()),
    }
}

fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_accepts_millis_and_rfc3339() {
        assert!(parse_since("").is_none());
        let ms = parse_since("1600000000000").unwrap();
        assert_eq!(ms.timestamp(), 1_600_000_000);
        let rfc = parse_since("2020-09-13T12:26:40Z").unwrap();
        assert_eq!(rfc, ms);
        assert!(parse_since("garbage").is_none());
    }
}
