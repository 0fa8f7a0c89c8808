// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor server` command: wires storage, caches, services and background
//! loops, then serves the REST API until SIGTERM or ctrl-c.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parlor_backup::{Backup, BackupParams};
use parlor_cache::{BroadcastBus, CacheOptions, CommentCache, FlusherRequest};
use parlor_config::ParlorConfig;
use parlor_core::{CacheBus, Destination, ParlorError};
use parlor_gateway::{AppState, AuthConfig, RateLimiter};
use parlor_image::{
    FsImageStore, ImageLimits, ImageService, SqliteImageStore,
};
use parlor_notify::{LogDestination, NotifyService, WebhookDestination};
use parlor_service::{
    AdminStores, CommentFormatter, DataService, RestrictedWordsMatcher, RpcAdminStore,
    ServiceParams, StaticAdminStore, StaticWordLister, TitleExtractor,
};
use parlor_storage::SqliteEngine;
use parlor_stream::{StreamParams, Streamer};

/// Write throughput allowed per client IP, requests per second.
const WRITE_RATE: f64 = 10.0;

/// Lower bound for the image staging TTL: five default edit windows.
const STAGING_TTL_FLOOR_SECS: u64 = 5 * 300;

/// Staged images must outlive the edit window, or an in-window edit could
/// reference an already swept upload.
fn staging_ttl(edit_time_secs: u64) -> Duration {
    Duration::from_secs(edit_time_secs.max(STAGING_TTL_FLOOR_SECS))
}

pub async fn run_server(config: ParlorConfig) -> Result<(), ParlorError> {
    let shutdown = CancellationToken::new();

    // storage
    let engine: Arc<dyn parlor_core::Engine> = Arc::new(
        SqliteEngine::open(Path::new(&config.store.path), &config.server.sites).await?,
    );

    // admin store
    let admin_store: Arc<dyn parlor_core::AdminStore> = Arc::new(match config.admin.kind.as_str() {
        "rpc" => AdminStores::Rpc(RpcAdminStore::new(config.admin.rpc_url.clone())?),
        _ => AdminStores::Static(StaticAdminStore::new(
            config.auth.secret.clone(),
            config.admin.admins.clone(),
            config.admin.email.clone(),
            config.server.sites.clone(),
        )),
    });

    // business layer
    let proxy = config
        .image
        .proxy
        .then(|| format!("{}/api/v1/img", config.server.url.trim_end_matches('/')));
    let formatter = CommentFormatter::new(proxy)?;
    let words = RestrictedWordsMatcher::new(Arc::new(StaticWordLister::new(
        config.words.restricted.clone(),
    )));
    let titles = Some(Arc::new(TitleExtractor::new()?));
    let params = ServiceParams {
        max_comment_size: config.limits.max_comment_size,
        max_votes: config.limits.max_votes,
        positive_score: config.limits.positive_score,
        readonly_age_days: config.limits.readonly_age_days,
        edit_duration: Duration::from_secs(config.limits.edit_time_secs),
        restrict_same_ip_votes: config.vote.restrict_same_ip,
        same_ip_vote_duration: Duration::from_secs(config.vote.same_ip_duration_secs),
    };
    let svc = Arc::new(DataService::new(
        engine.clone(),
        admin_store,
        formatter,
        words,
        titles,
        params,
    ));

    // loading cache and the invalidation bus
    let cache = Arc::new(match config.cache.kind.as_str() {
        "none" => CommentCache::disabled(),
        _ => CommentCache::memory(CacheOptions {
            max_keys: config.cache.max_items,
            max_value_size: config.cache.max_value,
            max_cache_size: config.cache.max_size,
            ttl: None,
        }),
    });
    let bus = BroadcastBus::default();
    let instance_id = instance_id();
    {
        let cache = cache.clone();
        let own_id = instance_id.clone();
        bus.subscribe(Box::new(move |from_id, scopes| {
            if from_id == own_id {
                return;
            }
            match FlusherRequest::parse(scopes) {
                Some(req) => {
                    cache.flush(&req);
                }
                None => warn!(scopes, "unparseable flush event ignored"),
            }
        }))
        .await?;
    }

    // images
    let image_store: Arc<dyn parlor_core::ImageStore> = match config.image.kind.as_str() {
        "sqlite" => Arc::new(
            SqliteImageStore::open(Path::new(&config.image.fs_root).join("images.db").as_path())
                .await?,
        ),
        _ => Arc::new(FsImageStore::new(
            config.image.fs_root.clone(),
            config.image.fs_staging.clone(),
            config.image.partitions,
        )),
    };
    let images = Arc::new(ImageService::new(
        image_store,
        ImageLimits {
            max_size: config.image.max_size,
            max_width: config.image.max_width,
            max_height: config.image.max_height,
        },
    ));
    images.start_cleanup(staging_ttl(config.limits.edit_time_secs), shutdown.clone());

    // notifications
    let mut destinations: Vec<Arc<dyn Destination>> = vec![Arc::new(LogDestination)];
    if let Some(url) = &config.notify.webhook_url {
        destinations.push(Arc::new(WebhookDestination::new(url.clone())?));
    }
    let notify = NotifyService::start(destinations, config.notify.queue_size, shutdown.clone());

    // long-poll streams
    let streamer = Arc::new(Streamer::new(
        engine.clone(),
        StreamParams {
            refresh: Duration::from_secs(config.stream.refresh_secs),
            inactivity_timeout: Duration::from_secs(config.stream.timeout_secs),
            max_active: config.stream.max_active,
        },
        shutdown.clone(),
    ));

    // per-site backup schedules
    for site in &config.server.sites {
        let backup = Arc::new(Backup::new(
            svc.clone(),
            site.clone(),
            BackupParams {
                location: config.backup.location.clone().into(),
                interval: Duration::from_secs(config.backup.duration_hours * 3600),
                keep_max: config.backup.max_files,
            },
        ));
        backup.start(shutdown.clone());
    }

    // gateway
    let state = AppState {
        svc,
        cache,
        streamer,
        notify: Some(notify),
        images: Some(images),
        auth: AuthConfig {
            admin_passwd: (!config.server.admin_passwd.is_empty())
                .then(|| config.server.admin_passwd.clone()),
        },
        limiter: Arc::new(RateLimiter::new(WRITE_RATE)),
        base_url: config.server.url.clone(),
        image_prefix: format!(
            "{}/api/v1/picture",
            config.server.url.trim_end_matches('/')
        ),
    };

    let addr = format!("0.0.0.0:{}", config.server.port);
    info!(
        addr,
        sites = config.server.sites.len(),
        instance = %instance_id,
        "parlor server starting"
    );

    let server = {
        let token = shutdown.clone();
        tokio::spawn(async move { parlor_gateway::start_server(&addr, state, token).await })
    };

    wait_for_shutdown().await;
    info!("shutdown signal received");
    shutdown.cancel();

    match server.await {
        Ok(result) => result?,
        Err(e) => return Err(ParlorError::Internal(format!("server task panicked: {e}"))),
    }
    engine.close().await?;
    info!("parlor server stopped");
    Ok(())
}

fn instance_id() -> String {
    // pid plus start time is unique enough to filter our own bus events
    format!(
        "parlor-{}-{}",
        std::process::id(),
        chrono::Utc::now().timestamp()
    )
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, using ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_ttl_never_shorter_than_edit_window() {
        // default window keeps the floor
        assert_eq!(staging_ttl(300), Duration::from_secs(1500));
        // a 48h edit window stretches the ttl to match
        assert_eq!(staging_ttl(48 * 3600), Duration::from_secs(48 * 3600));
    }
}
