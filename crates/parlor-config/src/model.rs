// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parlor commenting service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parlor configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with the documented
/// upper-snake environment variables (`REMARK_URL`, `SECRET`, ...) layered
/// on top. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlorConfig {
    /// Public URL, bind port, sites, and the admin basic-auth password.
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared secret used for IP hashing and user-token verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Storage engine settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Auto-backup scheduler settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Comment business-rule limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Loading cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Image proxy and image store settings.
    #[serde(default)]
    pub image: ImageConfig,

    /// Avatar store settings.
    #[serde(default)]
    pub avatar: AvatarConfig,

    /// Long-poll stream engine settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Admin store selection (static from config, or remote RPC).
    #[serde(default)]
    pub admin: AdminConfig,

    /// Restricted-words filtering.
    #[serde(default)]
    pub words: WordsConfig,

    /// Vote accounting knobs.
    #[serde(default)]
    pub vote: VoteConfig,

    /// Notification queue and destinations.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Server identity and bind settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Public base URL of the service.
    #[serde(default = "default_url")]
    pub url: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Password for the `admin` basic-auth user. Empty disables basic auth.
    #[serde(default)]
    pub admin_passwd: String,

    /// Site ids served by this instance.
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            port: default_port(),
            admin_passwd: String::new(),
            sites: default_sites(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_sites() -> Vec<String> {
    vec!["parlor".to_string()]
}

/// Shared-secret settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HMAC secret. Required at startup when the static admin store is used.
    #[serde(default)]
    pub secret: String,
}

/// Storage engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Engine kind. Only `sqlite` ships in-tree.
    #[serde(default = "default_store_kind")]
    pub kind: String,

    /// Directory holding one database file per site.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            path: default_store_path(),
        }
    }
}

fn default_store_kind() -> String {
    "sqlite".to_string()
}

fn default_store_path() -> String {
    "./var".to_string()
}

/// Auto-backup settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Directory receiving `backup-<site>-<yyyymmdd>.gz` files.
    #[serde(default = "default_backup_location")]
    pub location: String,

    /// Newest files kept per site, by lexical filename order.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Hours between backups.
    #[serde(default = "default_backup_hours")]
    pub duration_hours: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            location: default_backup_location(),
            max_files: default_max_files(),
            duration_hours: default_backup_hours(),
        }
    }
}

fn default_backup_location() -> String {
    "./var/backup".to_string()
}

fn default_max_files() -> usize {
    10
}

fn default_backup_hours() -> u64 {
    24
}

/// Comment business-rule limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size of the raw comment source, in unicode characters.
    #[serde(default = "default_max_comment_size")]
    pub max_comment_size: usize,

    /// Votes allowed per comment. `-1` unlimited, `0` disables voting.
    #[serde(default = "default_max_votes")]
    pub max_votes: i64,

    /// Score below which a comment is marked low-quality by the widget.
    #[serde(default = "default_low_score")]
    pub low_score: i64,

    /// Score at which a comment is hidden by the widget.
    #[serde(default = "default_critical_score")]
    pub critical_score: i64,

    /// Reject replies to comments with a negative score.
    #[serde(default)]
    pub positive_score: bool,

    /// Days after the first comment when a post turns read-only. 0 disables.
    #[serde(default)]
    pub readonly_age_days: u64,

    /// Seconds after posting during which the author may edit or delete.
    #[serde(default = "default_edit_time")]
    pub edit_time_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_comment_size: default_max_comment_size(),
            max_votes: default_max_votes(),
            low_score: default_low_score(),
            critical_score: default_critical_score(),
            positive_score: false,
            readonly_age_days: 0,
            edit_time_secs: default_edit_time(),
        }
    }
}

fn default_max_comment_size() -> usize {
    2000
}

fn default_max_votes() -> i64 {
    -1
}

fn default_low_score() -> i64 {
    -5
}

fn default_critical_score() -> i64 {
    -10
}

fn default_edit_time() -> u64 {
    300
}

/// Loading cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache kind: `mem` or `none`.
    #[serde(default = "default_cache_kind")]
    pub kind: String,

    /// Maximum number of cached keys.
    #[serde(default = "default_cache_items")]
    pub max_items: usize,

    /// Maximum size of a single cached value, in bytes.
    #[serde(default = "default_cache_value")]
    pub max_value: usize,

    /// Maximum total cache size, in bytes.
    #[serde(default = "default_cache_size")]
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: default_cache_kind(),
            max_items: default_cache_items(),
            max_value: default_cache_value(),
            max_size: default_cache_size(),
        }
    }
}

fn default_cache_kind() -> String {
    "mem".to_string()
}

fn default_cache_items() -> usize {
    1000
}

fn default_cache_value() -> usize {
    65_536
}

fn default_cache_size() -> usize {
    50 * 1024 * 1024
}

/// Image proxy and store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Rewrite `<img src>` through the image proxy.
    #[serde(default)]
    pub proxy: bool,

    /// Store kind: `fs` or `sqlite`.
    #[serde(default = "default_image_kind")]
    pub kind: String,

    /// Committed partition root (fs backend).
    #[serde(default = "default_image_root")]
    pub fs_root: String,

    /// Staging partition root (fs backend).
    #[serde(default = "default_image_staging")]
    pub fs_staging: String,

    /// Number of fan-out partitions under the fs roots.
    #[serde(default = "default_image_partitions")]
    pub partitions: u16,

    /// Maximum upload size, in bytes.
    #[serde(default = "default_image_max_size")]
    pub max_size: usize,

    /// Maximum width; larger images are downscaled preserving aspect.
    #[serde(default = "default_image_max_width")]
    pub max_width: u32,

    /// Maximum height; larger images are downscaled preserving aspect.
    #[serde(default = "default_image_max_height")]
    pub max_height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            proxy: false,
            kind: default_image_kind(),
            fs_root: default_image_root(),
            fs_staging: default_image_staging(),
            partitions: default_image_partitions(),
            max_size: default_image_max_size(),
            max_width: default_image_max_width(),
            max_height: default_image_max_height(),
        }
    }
}

fn default_image_kind() -> String {
    "fs".to_string()
}

fn default_image_root() -> String {
    "./var/pictures".to_string()
}

fn default_image_staging() -> String {
    "./var/pictures.staging".to_string()
}

fn default_image_partitions() -> u16 {
    100
}

fn default_image_max_size() -> usize {
    5 * 1024 * 1024
}

fn default_image_max_width() -> u32 {
    2400
}

fn default_image_max_height() -> u32 {
    900
}

/// Avatar store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AvatarConfig {
    /// Store kind: `fs` or `sqlite`.
    #[serde(default = "default_avatar_kind")]
    pub kind: String,

    /// Directory for the fs backend, or database file for the sqlite backend.
    #[serde(default = "default_avatar_path")]
    pub path: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            kind: default_avatar_kind(),
            path: default_avatar_path(),
        }
    }
}

fn default_avatar_kind() -> String {
    "fs".to_string()
}

fn default_avatar_path() -> String {
    "./var/avatars".to_string()
}

/// Long-poll stream settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Seconds between engine polls per subscription.
    #[serde(default = "default_stream_refresh")]
    pub refresh_secs: u64,

    /// Seconds of inactivity after which a stream closes.
    #[serde(default = "default_stream_timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrently active streams.
    #[serde(default = "default_stream_max")]
    pub max_active: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_stream_refresh(),
            timeout_secs: default_stream_timeout(),
            max_active: default_stream_max(),
        }
    }
}

fn default_stream_refresh() -> u64 {
    5
}

fn default_stream_timeout() -> u64 {
    15 * 60
}

fn default_stream_max() -> usize {
    500
}

/// Admin store selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// `static` (from this config) or `rpc` (remote HTTP).
    #[serde(default = "default_admin_kind")]
    pub kind: String,

    /// Endpoint for the rpc variant.
    #[serde(default)]
    pub rpc_url: String,

    /// Admin user ids shared by all sites (static variant).
    #[serde(default)]
    pub admins: Vec<String>,

    /// Moderation contact email (static variant).
    #[serde(default)]
    pub email: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            kind: default_admin_kind(),
            rpc_url: String::new(),
            admins: Vec::new(),
            email: String::new(),
        }
    }
}

fn default_admin_kind() -> String {
    "static".to_string()
}

/// Restricted-words filtering.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WordsConfig {
    /// Disallowed token patterns; `*` matches any substring at its position.
    #[serde(default)]
    pub restricted: Vec<String>,
}

/// Vote accounting knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoteConfig {
    /// Reject repeated votes from the same hashed IP within the window.
    #[serde(default)]
    pub restrict_same_ip: bool,

    /// Same-IP throttle window, in seconds.
    #[serde(default = "default_same_ip_secs")]
    pub same_ip_duration_secs: u64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            restrict_same_ip: false,
            same_ip_duration_secs: default_same_ip_secs(),
        }
    }
}

fn default_same_ip_secs() -> u64 {
    24 * 60 * 60
}

/// Notification queue settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Bounded queue depth; overflow drops the oldest entry with a warning.
    #[serde(default = "default_notify_queue")]
    pub queue_size: usize,

    /// Optional webhook endpoint receiving one JSON body per notification.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            queue_size: default_notify_queue(),
            webhook_url: None,
        }
    }
}

fn default_notify_queue() -> usize {
    100
}
