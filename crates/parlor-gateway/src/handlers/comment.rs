// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated write routes: create, edit, delete and vote.
//!
//! Each handler checks the per-IP token bucket, carries the resolved user
//! into the data service and flushes the relevant cache scopes on success.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use parlor_core::{Comment, Locator, NotifyRequest};
use parlor_image::referenced_ids;
use parlor_service::EditRequest;

use crate::auth::AuthInfo;
use crate::caching::flush_write;
use crate::error::ApiError;
use crate::rate::client_key;
use crate::server::AppState;

fn throttle(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if !state.limiter.allow(&client_key(headers)) {
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "too many write requests",
            "rate limit exceeded",
        ));
    }
    Ok(())
}

/// POST /api/v1/comment: create a comment as the authenticated user.
pub async fn create(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    headers: HeaderMap,
    Json(mut comment): Json<Comment>,
) -> Result<Response, ApiError> {
    throttle(&state, &headers)?;
    let user = auth.require_user()?.clone();

    // the token decides who is writing, not the body
    comment.user = user;
    comment.user.ip = client_key(&headers);

    let created = state.svc.create(comment).await?;
    flush_write(
        &state,
        &created.locator.site,
        &created.locator.url,
        &created.user.id,
    );

    if let Some(images) = &state.images {
        let ids = referenced_ids(&created.text, &state.image_prefix);
        if !ids.is_empty() {
            if let Err(e) = images.commit(&ids).await {
                warn!(error = %e, "image commit after create failed");
            }
        }
    }

    if let Some(notify) = &state.notify {
        let parent = if created.parent_id.is_empty() {
            None
        } else {
            state
                .svc
                .engine()
                .get(&created.locator, &created.parent_id)
                .await
                .ok()
        };
        notify.submit(NotifyRequest {
            comment: created.clone(),
            parent,
        });
    }

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LocatorQuery {
    pub site: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub delete: bool,
}

/// PUT /api/v1/comment/{id}: edit own comment within the window; admins
/// edit anything.
pub async fn edit(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<LocatorQuery>,
    Json(body): Json<EditBody>,
) -> Result<Response, ApiError> {
    throttle(&state, &headers)?;
    let user = auth.require_user()?.clone();

    let locator = Locator::new(&q.site, &q.url);
    let updated = state
        .svc
        .edit(
            &locator,
            &id,
            &user.id,
            EditRequest {
                orig: body.text,
                summary: body.summary,
                delete: body.delete,
            },
            user.admin,
        )
        .await?;
    flush_write(&state, &q.site, &q.url, &user.id);
    Ok(Json(updated).into_response())
}

/// DELETE /api/v1/comment/{id}: soft-delete own comment within the window.
pub async fn delete(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<LocatorQuery>,
) -> Result<Response, ApiError> {
    throttle(&state, &headers)?;
    let user = auth.require_user()?.clone();

    let locator = Locator::new(&q.site, &q.url);
    state
        .svc
        .edit(
            &locator,
            &id,
            &user.id,
            EditRequest {
                delete: true,
                ..EditRequest::default()
            },
            user.admin,
        )
        .await?;
    flush_write(&state, &q.site, &q.url, &user.id);
    Ok(Json(json!({ "id": id, "site": q.site, "url": q.url })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    pub site: String,
    pub url: String,
    pub vote: i8,
}

/// PUT /api/v1/vote/{id}: up or down vote, `vote=1` or `vote=-1`.
pub async fn vote(
    State(state): State<AppState>,
    auth: axum::Extension<AuthInfo>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<VoteQuery>,
) -> Result<Response, ApiError> {
    throttle(&state, &headers)?;
    let mut user = auth.require_user()?.clone();
    user.ip = client_key(&headers);

    let val = match q.vote {
        1 => true,
        -1 => false,
        other => {
            return Err(ApiError::bad_request(
                format!("invalid vote value {other}"),
                "vote must be 1 or -1",
            ));
        }
    };

    let locator = Locator::new(&q.site, &q.url);
    let updated = state.svc.vote(&locator, &id, &user, val).await?;
    flush_write(&state, &q.site, &q.url, &user.id);
    Ok(Json(json!({ "id": updated.id, "score": updated.score })).into_response())
}
