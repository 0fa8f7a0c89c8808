// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model shared across the Parlor workspace.
//!
//! JSON field names follow the v1 wire format that embedded widgets depend on
//! (`pid`, `time`, `voteIPs`, ...), so serde renames are explicit throughout.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The pair `(site, url)` identifying a discussion partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub site: String,
    pub url: String,
}

impl Locator {
    pub fn new(site: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            url: url.into(),
        }
    }
}

/// The author of a comment as stored alongside it.
///
/// `ip` holds the HMAC hash of the client address, never the raw address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, rename = "block")]
    pub blocked: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Edit metadata attached to a comment after an in-window modification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
}

/// A single comment anchored to a locator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "pid", default)]
    pub parent_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub orig: String,
    #[serde(default)]
    pub user: User,
    pub locator: Locator,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub controversy: f64,
    #[serde(default)]
    pub votes: HashMap<String, bool>,
    #[serde(rename = "voteIPs", default)]
    pub vote_ips: HashMap<String, DateTime<Utc>>,
    #[serde(rename = "time", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub edit: Option<Edit>,
    #[serde(default)]
    pub pin: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub imported: bool,
    #[serde(default)]
    pub title: String,
}

impl Default for Comment {
    fn default() -> Self {
        Self {
            id: String::new(),
            parent_id: String::new(),
            text: String::new(),
            orig: String::new(),
            user: User::default(),
            locator: Locator::default(),
            score: 0,
            controversy: 0.0,
            votes: HashMap::new(),
            vote_ips: HashMap::new(),
            timestamp: Utc::now(),
            edit: None,
            pin: false,
            deleted: false,
            imported: false,
            title: String::new(),
        }
    }
}

impl Comment {
    /// Recompute `score` and `controversy` from the vote map.
    pub fn recount_votes(&mut self) {
        let ups = self.votes.values().filter(|v| **v).count() as i64;
        let downs = self.votes.len() as i64 - ups;
        self.score = ups - downs;
        self.controversy = controversy(ups as u64, downs as u64);
    }

    /// Scrub the comment according to the delete mode.
    ///
    /// Both modes empty the text and anonymize the author; soft delete keeps
    /// the record in place so replies stay attached, hard delete is followed
    /// by physical removal in the engine.
    pub fn mark_deleted(&mut self, mode: DeleteMode) {
        self.text = String::new();
        self.orig = String::new();
        self.score = 0;
        self.controversy = 0.0;
        self.votes = HashMap::new();
        self.vote_ips = HashMap::new();
        self.edit = None;
        self.pin = false;
        self.deleted = true;
        self.user = User {
            id: if mode == DeleteMode::Hard {
                "deleted".to_string()
            } else {
                self.user.id.clone()
            },
            name: "deleted".to_string(),
            ..User::default()
        };
    }
}

/// Controversy rank: `min(u,d)^1.5 / max(u,d)`, zero when either side is zero.
pub fn controversy(ups: u64, downs: u64) -> f64 {
    if ups == 0 || downs == 0 {
        return 0.0;
    }
    let (min, max) = (ups.min(downs) as f64, ups.max(downs) as f64);
    min.powf(1.5) / max
}

/// How a delete should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Scrub in place; the record remains so replies keep their parent.
    Soft,
    /// Remove the record entirely, including secondary indexes.
    Hard,
}

/// Aggregate information about one commented page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostInfo {
    pub url: String,
    pub count: usize,
    #[serde(rename = "firstTS", default)]
    pub first_ts: Option<DateTime<Utc>>,
    #[serde(rename = "lastTS", default)]
    pub last_ts: Option<DateTime<Utc>>,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
}

/// A user blocked on a site, with the block expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub id: String,
    pub until: DateTime<Utc>,
}

/// Block state carried inside [`UserMetaData`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockedMeta {
    pub status: bool,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

/// Per-user flags preserved across export/import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetaData {
    pub id: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub blocked: BlockedMeta,
}

/// Per-post flags preserved across export/import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetaData {
    pub url: String,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
}

/// Field a comment listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Time,
    Score,
    Controversy,
    Active,
}

/// A parsed sort key (`+time`, `-score`, `controversy`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub desc: bool,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            field: SortField::Time,
            desc: false,
        }
    }
}

impl SortKey {
    /// Parse a sort query parameter. A single-letter prefix picks the
    /// direction; unknown fields fall back to ascending time.
    pub fn parse(s: &str) -> Self {
        let (desc, field) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let field = match field {
            "score" => SortField::Score,
            "controversy" => SortField::Controversy,
            "active" => SortField::Active,
            _ => SortField::Time,
        };
        Self { field, desc }
    }
}

/// A notification emitted after a successful comment write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub comment: Comment,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<Comment>,
}
