// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL remapping: export the site, rewrite comment locators and post meta
//! URLs through a rule list, wipe the site and import the rewritten dump.

use std::io::BufReader;

use tokio_util::sync::CancellationToken;
use tracing::info;

use parlor_core::ParlorError;
use parlor_service::DataService;

use crate::native;

/// Ordered rewrite rules, one per line: `<old-url> <new-url>`. A trailing
/// `*` on the old side matches any suffix; a trailing `*` on the new side
/// carries that suffix over.
pub struct UrlMapper {
    rules: Vec<(String, String)>,
}

impl UrlMapper {
    pub fn parse(rules_text: &str) -> Result<Self, ParlorError> {
        let mut rules = Vec::new();
        for line in rules_text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(old), Some(new), None) => rules.push((old.to_string(), new.to_string())),
                _ => {
                    return Err(ParlorError::Validation(format!(
                        "invalid remap rule {line:?}"
                    )));
                }
            }
        }
        if rules.is_empty() {
            return Err(ParlorError::Validation("no remap rules".into()));
        }
        Ok(Self { rules })
    }

    /// First matching rule wins; `None` leaves the URL as-is.
    pub fn map(&self, url: &str) -> Option<String> {
        for (old, new) in &self.rules {
            if let Some(prefix) = old.strip_suffix('*') {
                if let Some(suffix) = url.strip_prefix(prefix) {
                    return Some(match new.strip_suffix('*') {
                        Some(new_prefix) => format!("{new_prefix}{suffix}"),
                        None => new.clone(),
                    });
                }
            } else if url == old {
                return Some(new.clone());
            }
        }
        None
    }
}

/// Rewrite every comment locator and post meta URL on `site` per the rules,
/// in place. Returns the number of comments re-imported.
pub async fn remap(
    svc: &DataService,
    site: &str,
    rules_text: &str,
    cancel: &CancellationToken,
) -> Result<usize, ParlorError> {
    let mapper = UrlMapper::parse(rules_text)?;

    let mut dump = Vec::new();
    native::export(svc, site, &mut dump).await?;

    let mut rewritten = String::with_capacity(dump.len());
    for (i, line) in String::from_utf8_lossy(&dump).lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if i == 0 {
            let mut meta: native::Meta = serde_json::from_str(line)
                .map_err(|e| ParlorError::Internal(format!("broken export header: {e}")))?;
            for post in &mut meta.posts {
                if let Some(new_url) = mapper.map(&post.url) {
                    post.url = new_url;
                }
            }
            rewritten.push_str(
                &serde_json::to_string(&meta).map_err(ParlorError::storage)?,
            );
        } else {
            let mut comment: parlor_core::Comment = serde_json::from_str(line)
                .map_err(|e| ParlorError::Internal(format!("broken export line: {e}")))?;
            if let Some(new_url) = mapper.map(&comment.locator.url) {
                comment.locator.url = new_url;
            }
            rewritten.push_str(
                &serde_json::to_string(&comment).map_err(ParlorError::storage)?,
            );
        }
        rewritten.push('\n');
    }

    let saved = native::import(svc, site, BufReader::new(rewritten.as_bytes()), cancel).await?;
    info!(site, saved, "remap finished");
    Ok(saved)
}
