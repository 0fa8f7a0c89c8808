// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin routes: moderation flags, hard deletes, export/import and URL
//! remapping. Every handler requires an admin caller.

use std::io::{BufReader, Write};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use parlor_core::{DeleteMode, Locator};

use crate::auth::AuthInfo;
use crate::caching::{flush_site, flush_write};
use crate::error::ApiError;
use crate::handlers::comment::LocatorQuery;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub site: String,
    #[serde(default)]
    pub mode: String,
}

/// GET /api/v1/admin/export: native dump, gzipped when `mode=file`.
pub async fn export(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Query(q): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;

    let mut dump = Vec::new();
    parlor_migrator::export(&state.svc, &q.site, &mut dump).await?;

    if q.mode == "file" {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&dump)
            .map_err(parlor_core::ParlorError::storage)?;
        let gz = encoder
            .finish()
            .map_err(parlor_core::ParlorError::storage)?;
        let disposition = format!(
            "attachment; filename=\"backup-{}-{}.gz\"",
            q.site,
            Utc::now().format("%Y%m%d")
        );
        Ok((
            [
                ("content-type", "application/gzip".to_string()),
                ("content-disposition", disposition),
            ],
            gz,
        )
            .into_response())
    } else {
        Ok((
            [("content-type", "application/x-ndjson")],
            dump,
        )
            .into_response())
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub site: String,
    #[serde(default)]
    pub provider: String,
}

/// POST /api/v1/admin/import: replace site content from a dump. Provider
/// is one of native, disqus, wordpress, commento.
pub async fn import(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Query(q): Query<ImportQuery>,
    body: String,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let cancel = CancellationToken::new();

    let size = match q.provider.as_str() {
        "" | "native" => {
            parlor_migrator::import(&state.svc, &q.site, BufReader::new(body.as_bytes()), &cancel)
                .await?
        }
        "disqus" => {
            let comments = parlor_migrator::disqus::parse(&q.site, &body)?;
            parlor_migrator::import_comments(&state.svc, &q.site, comments, &cancel).await?
        }
        "wordpress" => {
            let comments = parlor_migrator::wordpress::parse(&q.site, &body)?;
            parlor_migrator::import_comments(&state.svc, &q.site, comments, &cancel).await?
        }
        "commento" => {
            let comments = parlor_migrator::commento::parse(&q.site, &state.base_url, &body)?;
            parlor_migrator::import_comments(&state.svc, &q.site, comments, &cancel).await?
        }
        other => {
            return Err(ApiError::bad_request(
                format!("unknown import provider {other:?}"),
                "provider must be native, disqus, wordpress or commento",
            ));
        }
    };

    flush_site(&state, &q.site);
    Ok((StatusCode::CREATED, Json(json!({ "status": "ok", "size": size }))).into_response())
}

/// DELETE /api/v1/admin/comment/{id}: hard delete.
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Path(id): Path<String>,
    Query(q): Query<LocatorQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let locator = Locator::new(&q.site, &q.url);
    state.svc.delete(&locator, &id, DeleteMode::Hard).await?;
    flush_write(&state, &q.site, &q.url, "");
    Ok(Json(json!({ "id": id })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SiteQuery {
    pub site: String,
}

/// DELETE /api/v1/admin/user/{user_id}: drop all of a user's comments.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Path(user_id): Path<String>,
    Query(q): Query<SiteQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    state.svc.engine().delete_user(&q.site, &user_id).await?;
    flush_site(&state, &q.site);
    Ok(Json(json!({ "user_id": user_id, "site": q.site })).into_response())
}

/// PUT /api/v1/admin/title/{id}: refresh the comment's page title.
pub async fn title(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Path(id): Path<String>,
    Query(q): Query<LocatorQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let locator = Locator::new(&q.site, &q.url);
    state.svc.set_title(&locator, &id).await?;
    flush_write(&state, &q.site, &q.url, "");
    Ok(Json(json!({ "id": id })).into_response())
}

/// POST /api/v1/admin/remap: rewrite URLs per the rules in the body.
pub async fn remap(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Query(q): Query<SiteQuery>,
    body: String,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let moved =
        parlor_migrator::remap(&state.svc, &q.site, &body, &CancellationToken::new()).await?;
    flush_site(&state, &q.site);
    Ok(Json(json!({ "status": "ok", "size": moved })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct PinQuery {
    pub site: String,
    pub url: String,
    #[serde(default)]
    pub pin: u8,
}

/// PUT /api/v1/admin/pin/{id}: pin (`pin=1`) or unpin (`pin=0`).
pub async fn pin(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Path(id): Path<String>,
    Query(q): Query<PinQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let locator = Locator::new(&q.site, &q.url);
    state.svc.set_pin(&locator, &id, q.pin == 1).await?;
    flush_write(&state, &q.site, &q.url, "");
    Ok(Json(json!({ "id": id, "pin": q.pin == 1 })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BlockQuery {
    pub site: String,
    #[serde(default)]
    pub block: u8,
    /// Block duration in seconds; absent or 0 means permanent.
    #[serde(default)]
    pub ttl: i64,
}

/// PUT /api/v1/admin/block/{user_id}: block or unblock a user.
pub async fn block(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Path(user_id): Path<String>,
    Query(q): Query<BlockQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let until = (q.ttl > 0).then(|| Utc::now() + Duration::seconds(q.ttl));
    state
        .svc
        .engine()
        .set_blocked(&q.site, &user_id, q.block == 1, until)
        .await?;
    flush_site(&state, &q.site);
    Ok(Json(json!({ "user_id": user_id, "block": q.block == 1 })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ReadonlyQuery {
    pub site: String,
    pub url: String,
    #[serde(default)]
    pub ro: u8,
}

/// PUT /api/v1/admin/readonly: set or clear the read-only flag on a post.
pub async fn readonly(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Query(q): Query<ReadonlyQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    let locator = Locator::new(&q.site, &q.url);
    state.svc.engine().set_read_only(&locator, q.ro == 1).await?;
    flush_write(&state, &q.site, &q.url, "");
    Ok(Json(json!({ "url": q.url, "readOnly": q.ro == 1 })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub site: String,
    #[serde(default)]
    pub verified: u8,
}

/// PUT /api/v1/admin/verify/{user_id}: set or clear the verified flag.
pub async fn verify(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    Path(user_id): Path<String>,
    Query(q): Query<VerifyQuery>,
) -> Result<Response, ApiError> {
    auth.require_admin()?;
    state
        .svc
        .engine()
        .set_verified(&q.site, &user_id, q.verified == 1)
        .await?;
    flush_site(&state, &q.site);
    Ok(Json(json!({ "user_id": user_id, "verified": q.verified == 1 })).into_response())
}
