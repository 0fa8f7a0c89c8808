// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spam sweep over a site's comments via the admin API.
//!
//! Scoring: 10 points per bad-word substring hit in the comment text, 50
//! points when the author name contains a bad-user substring; 50 points or
//! more marks the comment as spam.

use std::time::Duration;

use tracing::{info, warn};

use parlor_config::ParlorConfig;
use parlor_core::{Comment, ParlorError};

use crate::client::AdminClient;

pub const SPAM_THRESHOLD: u32 = 50;

const BAD_WORD_POINTS: u32 = 10;
const BAD_USER_POINTS: u32 = 50;
const DELETE_RETRIES: usize = 5;

/// Spam score for one comment against the configured word and user lists.
/// Matching is case-insensitive substring search.
pub fn spam_score(comment: &Comment, bad_words: &[String], bad_users: &[String]) -> u32 {
    let text = comment.orig.to_lowercase();
    let mut score = 0;
    for word in bad_words {
        let word = word.to_lowercase();
        if !word.is_empty() {
            score += BAD_WORD_POINTS * text.matches(&word).count() as u32;
        }
    }
    let name = comment.user.name.to_lowercase();
    if bad_users
        .iter()
        .any(|u| !u.is_empty() && name.contains(&u.to_lowercase()))
    {
        score += BAD_USER_POINTS;
    }
    score
}

pub async fn run_cleanup(
    config: &ParlorConfig,
    site: &str,
    bad_words: &[String],
    bad_users: &[String],
    dry_run: bool,
) -> Result<(), ParlorError> {
    let client = AdminClient::new(config)?;

    let mut scanned = 0usize;
    let mut deleted = 0usize;
    for post in client.list(site).await? {
        for comment in client.find(site, &post.url).await? {
            scanned += 1;
            let score = spam_score(&comment, bad_words, bad_users);
            if score < SPAM_THRESHOLD {
                continue;
            }
            info!(
                id = %comment.id,
                url = %post.url,
                score,
                user = %comment.user.name,
                "spam detected"
            );
            if dry_run {
                continue;
            }
            delete_with_retry(&client, site, &post.url, &comment.id).await?;
            deleted += 1;
        }
    }

    info!(site, scanned, deleted, dry_run, "cleanup finished");
    Ok(())
}

/// Delete one comment, backing off and retrying when the server throttles.
async fn delete_with_retry(
    client: &AdminClient,
    site: &str,
    url: &str,
    id: &str,
) -> Result<(), ParlorError> {
    for attempt in 0..DELETE_RETRIES {
        match client.delete_comment(site, url, id).await {
            Ok(()) => return Ok(()),
            Err(ParlorError::RateLimited) => {
                let pause = Duration::from_secs(1 << attempt);
                warn!(id, ?pause, "rate limited, backing off");
                tokio::time::sleep(pause).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(ParlorError::RateLimited)
}
