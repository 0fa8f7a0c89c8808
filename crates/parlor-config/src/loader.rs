// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./parlor.toml` > `~/.config/parlor/parlor.toml`
//! > `/etc/parlor/parlor.toml`, with the documented upper-snake environment
//! variables (`REMARK_URL`, `SECRET`, `SITE`, ...) layered on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParlorConfig;

/// The recognized environment variables and the config keys they map onto.
///
/// Names mirror the server flags in upper-snake form; they are matched
/// exactly (no prefix) because deployed clients already export them.
const ENV_KEYS: &[(&str, &str)] = &[
    ("REMARK_URL", "server.url"),
    ("REMARK_PORT", "server.port"),
    ("ADMIN_PASSWD", "server.admin_passwd"),
    ("SECRET", "auth.secret"),
    ("BACKUP_PATH", "backup.location"),
    ("MAX_BACKUP_FILES", "backup.max_files"),
    ("MAX_COMMENT_SIZE", "limits.max_comment_size"),
    ("MAX_VOTES", "limits.max_votes"),
    ("LOW_SCORE", "limits.low_score"),
    ("CRITICAL_SCORE", "limits.critical_score"),
    ("POSITIVE_SCORE", "limits.positive_score"),
    ("READONLY_AGE", "limits.readonly_age_days"),
    ("EDIT_TIME", "limits.edit_time_secs"),
    ("STORE_TYPE", "store.kind"),
    ("STORE_BOLT_PATH", "store.path"),
    ("AVATAR_TYPE", "avatar.kind"),
    ("CACHE_TYPE", "cache.kind"),
    ("CACHE_MAX_ITEMS", "cache.max_items"),
    ("CACHE_MAX_VALUE", "cache.max_value"),
    ("CACHE_MAX_SIZE", "cache.max_size"),
    ("IMG_PROXY", "image.proxy"),
    ("STREAM_REFRESH", "stream.refresh_secs"),
    ("STREAM_TIMEOUT", "stream.timeout_secs"),
    ("STREAM_MAX", "stream.max_active"),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parlor/parlor.toml` (system-wide)
/// 3. `~/.config/parlor/parlor.toml` (user XDG config)
/// 4. `./parlor.toml` (local directory)
/// 5. Documented environment variables
pub fn load_config() -> Result<ParlorConfig, figment::Error> {
    let config: ParlorConfig = build_figment().extract()?;
    Ok(apply_site_env(config))
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config file specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ParlorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParlorConfig, figment::Error> {
    let config: ParlorConfig = Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    Ok(apply_site_env(config))
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file("/etc/parlor/parlor.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("parlor/parlor.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("parlor.toml"))
        .merge(env_provider())
}

/// Environment provider restricted to the documented variable names.
///
/// Uses `Env::raw().only(...).map(...)` so unrelated environment variables
/// never reach the model (which would trip `deny_unknown_fields`), and each
/// recognized name maps to its exact dotted key.
fn env_provider() -> Env {
    let names: Vec<&str> = ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let upper = key.as_str().to_ascii_uppercase();
        ENV_KEYS
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, dotted)| (*dotted).into())
            .unwrap_or_else(|| key.into())
    })
}

/// `SITE` is a comma-separated list and cannot be coerced by figment into a
/// `Vec<String>`, so it is applied after extraction.
fn apply_site_env(mut config: ParlorConfig) -> ParlorConfig {
    if let Ok(sites) = std::env::var("SITE") {
        let parsed: Vec<String> = sites
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            config.server.sites = parsed;
        }
    }
    config
}
