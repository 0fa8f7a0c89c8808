// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the server entry point.

use std::sync::Arc;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{delete, get, post, put};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parlor_cache::CommentCache;
use parlor_core::ParlorError;
use parlor_image::ImageService;
use parlor_notify::NotifyService;
use parlor_service::DataService;
use parlor_stream::Streamer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers::{admin, comment, public};
use crate::rate::RateLimiter;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<DataService>,
    pub cache: Arc<CommentCache>,
    pub streamer: Arc<Streamer>,
    pub notify: Option<Arc<NotifyService>>,
    pub images: Option<Arc<ImageService>>,
    pub auth: AuthConfig,
    pub limiter: Arc<RateLimiter>,
    /// Public base URL of this instance, used to resolve relative import paths.
    pub base_url: String,
    /// Prefix image URLs must carry to be committed on comment create.
    pub image_prefix: String,
}

/// Build the full API router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/find", get(public::find))
        .route("/api/v1/last/{max}", get(public::last))
        .route("/api/v1/id/{id}", get(public::by_id))
        .route("/api/v1/count", get(public::count))
        .route("/api/v1/counts", post(public::counts))
        .route("/api/v1/list", get(public::list))
        .route("/api/v1/stream/last", get(public::stream_last))
        .route("/api/v1/comment", post(comment::create))
        .route(
            "/api/v1/comment/{id}",
            put(comment::edit).delete(comment::delete),
        )
        .route("/api/v1/vote/{id}", put(comment::vote))
        .route("/api/v1/admin/export", get(admin::export))
        .route("/api/v1/admin/import", post(admin::import))
        .route("/api/v1/admin/comment/{id}", delete(admin::delete_comment))
        .route("/api/v1/admin/user/{user_id}", delete(admin::delete_user))
        .route("/api/v1/admin/title/{id}", put(admin::title))
        .route("/api/v1/admin/remap", post(admin::remap))
        .route("/api/v1/admin/pin/{id}", put(admin::pin))
        .route("/api/v1/admin/block/{user_id}", put(admin::block))
        .route("/api/v1/admin/readonly", put(admin::readonly))
        .route("/api/v1/admin/verify/{user_id}", put(admin::verify))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the token is cancelled.
pub async fn start_server(
    addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ParlorError> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ParlorError::Config(format!("cannot bind {addr}: {e}")))?;
    info!(addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ParlorError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use base64::Engine as _;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use parlor_cache::CacheOptions;
    use parlor_core::{Comment, User};
    use parlor_service::{
        CommentFormatter, RestrictedWordsMatcher, ServiceParams, StaticAdminStore,
        StaticWordLister,
    };
    use parlor_storage::SqliteEngine;
    use parlor_stream::StreamParams;

    use crate::auth::Claims;
    use crate::sign_claims;

    const SECRET: &str = "gateway-test-secret";
    const PASSWD: &str = "hunter2";

    async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(
            SqliteEngine::open(dir.path(), &["site-1".to_string()])
                .await
                .unwrap(),
        );
        let admin = StaticAdminStore::new(
            SECRET.into(),
            vec!["admin".into()],
            "admin@example.com".into(),
            vec!["site-1".into()],
        );
        let svc = Arc::new(DataService::new(
            engine.clone(),
            Arc::new(admin),
            CommentFormatter::new(None).unwrap(),
            RestrictedWordsMatcher::new(Arc::new(StaticWordLister::new(vec![]))),
            None,
            ServiceParams::default(),
        ));
        let state = AppState {
            svc,
            cache: Arc::new(CommentCache::memory(CacheOptions::default())),
            streamer: Arc::new(Streamer::new(
                engine,
                StreamParams::default(),
                CancellationToken::new(),
            )),
            notify: None,
            images: None,
            auth: AuthConfig {
                admin_passwd: Some(PASSWD.into()),
            },
            limiter: Arc::new(RateLimiter::new(100.0)),
            base_url: "https://example.com".into(),
            image_prefix: "https://example.com/api/v1/picture".into(),
        };
        (state, dir)
    }

    fn bearer(user_id: &str, admin: bool) -> String {
        let claims = Claims {
            user: User {
                id: user_id.into(),
                name: user_id.into(),
                admin,
                ..User::default()
            },
            site: "site-1".into(),
            exp: Utc::now().timestamp() + 300,
        };
        format!("Bearer {}", sign_claims(SECRET, &claims).unwrap())
    }

    fn basic_admin() -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("admin:{PASSWD}"));
        format!("Basic {encoded}")
    }

    fn comment_body(text: &str) -> String {
        serde_json::to_string(&Comment {
            orig: text.into(),
            locator: parlor_core::Locator::new("site-1", "https://example.com/p1"),
            ..Comment::default()
        })
        .unwrap()
    }

    async fn json_of(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_requires_auth() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let resp = app
            .oneshot(
                Request::post("/api/v1/comment?site=site-1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(comment_body("hi")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = json_of(resp).await;
        assert_eq!(body["code"], 401);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn create_then_find_sees_the_comment() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/comment?site=site-1")
                    .header(header::AUTHORIZATION, bearer("u-1", false))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(comment_body("**hello**")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_of(resp).await;
        assert_eq!(created["user"]["id"], "u-1");
        assert!(created["text"].as_str().unwrap().contains("<strong>"));

        let resp = app
            .oneshot(
                Request::get(
                    "/api/v1/find?site=site-1&url=https%3A%2F%2Fexample.com%2Fp1&sort=%2Btime",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let listing = json_of(resp).await;
        assert_eq!(listing["comments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cache_serves_stale_until_write_flushes() {
        let (state, _dir) = test_state().await;
        let app = build_router(state.clone());
        let url = "/api/v1/find?site=site-1&url=https%3A%2F%2Fexample.com%2Fp1";

        // prime the cache with an empty listing
        let resp = app
            .clone()
            .oneshot(Request::get(url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_of(resp).await["comments"].as_array().unwrap().len(), 0);

        // write through the API flushes the url scope
        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/comment?site=site-1")
                    .header(header::AUTHORIZATION, bearer("u-1", false))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(comment_body("first")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(Request::get(url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_of(resp).await["comments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn vote_and_error_envelope() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/comment?site=site-1")
                    .header(header::AUTHORIZATION, bearer("author", false))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(comment_body("votable")))
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = json_of(resp).await["id"].as_str().unwrap().to_string();

        let vote_url = format!(
            "/api/v1/vote/{id}?site=site-1&url=https%3A%2F%2Fexample.com%2Fp1&vote=1"
        );
        let resp = app
            .clone()
            .oneshot(
                Request::put(&vote_url)
                    .header(header::AUTHORIZATION, bearer("voter", false))
                    .header("x-forwarded-for", "10.1.1.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_of(resp).await["score"], 1);

        // self vote is forbidden and wrapped in the envelope
        let resp = app
            .oneshot(
                Request::put(&vote_url)
                    .header(header::AUTHORIZATION, bearer("author", false))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = json_of(resp).await;
        assert_eq!(body["code"], 403);
    }

    #[tokio::test]
    async fn admin_basic_auth_hard_deletes() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/comment?site=site-1")
                    .header(header::AUTHORIZATION, bearer("u-1", false))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(comment_body("to be removed")))
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = json_of(resp).await["id"].as_str().unwrap().to_string();

        let del_url = format!(
            "/api/v1/admin/comment/{id}?site=site-1&url=https%3A%2F%2Fexample.com%2Fp1"
        );
        // non-admin caller is rejected
        let resp = app
            .clone()
            .oneshot(
                Request::delete(&del_url)
                    .header(header::AUTHORIZATION, bearer("u-1", false))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app
            .clone()
            .oneshot(
                Request::delete(&del_url)
                    .header(header::AUTHORIZATION, basic_admin())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::get("/api/v1/count?site=site-1&url=https%3A%2F%2Fexample.com%2Fp1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_of(resp).await["count"], 0);
    }

    #[tokio::test]
    async fn import_and_export_round_trip_over_http() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let dump = concat!(
            "{\"version\":1,\"users\":[],\"posts\":[]}\n",
            "{\"id\":\"x1\",\"user\":{\"id\":\"u9\",\"name\":\"nine\"},",
            "\"locator\":{\"site\":\"site-1\",\"url\":\"https://example.com/p9\"},",
            "\"text\":\"<p>nine</p>\",\"orig\":\"nine\",",
            "\"time\":\"2020-01-01T00:00:00Z\"}\n"
        );
        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/v1/admin/import?site=site-1&provider=native")
                    .header(header::AUTHORIZATION, basic_admin())
                    .body(Body::from(dump))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(json_of(resp).await["size"], 1);

        let resp = app
            .oneshot(
                Request::get("/api/v1/admin/export?site=site-1")
                    .header(header::AUTHORIZATION, basic_admin())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"id\":\"x1\""));
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let (mut state, _dir) = test_state().await;
        state.limiter = Arc::new(RateLimiter::new(1.0));
        let app = build_router(state);

        let send = |app: Router| async move {
            app.oneshot(
                Request::post("/api/v1/comment?site=site-1")
                    .header(header::AUTHORIZATION, bearer("u-1", false))
                    .header("x-forwarded-for", "10.2.2.2")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(comment_body("spam?")))
                    .unwrap(),
            )
            .await
            .unwrap()
        };
        let first = send(app.clone()).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = send(app).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
