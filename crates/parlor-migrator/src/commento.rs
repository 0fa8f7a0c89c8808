// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commento JSON importer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::debug;

use parlor_core::{Comment, Locator, ParlorError, User};

#[derive(Debug, Deserialize)]
struct Export {
    comments: Vec<ExportComment>,
    #[serde(default)]
    commenters: Vec<Commenter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportComment {
    comment_hex: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    path: String,
    creation_date: DateTime<Utc>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    markdown: String,
    commenter_hex: String,
    #[serde(default)]
    parent_hex: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Commenter {
    commenter_hex: String,
    #[serde(default)]
    name: String,
}

/// Parse a Commento JSON export into comments for `site`. `base_url` fills
/// in comments that only carry a path.
pub fn parse(site: &str, base_url: &str, json: &str) -> Result<Vec<Comment>, ParlorError> {
    let export: Export = serde_json::from_str(json)
        .map_err(|e| ParlorError::Validation(format!("broken commento json: {e}")))?;

    let names: HashMap<&str, &str> = export
        .commenters
        .iter()
        .map(|c| (c.commenter_hex.as_str(), c.name.as_str()))
        .collect();

    let mut out = Vec::new();
    for c in export.comments {
        if c.deleted {
            continue;
        }
        let url = if c.url.is_empty() {
            format!("{}{}", base_url.trim_end_matches('/'), c.path)
        } else {
            c.url.clone()
        };
        let name = names
            .get(c.commenter_hex.as_str())
            .copied()
            .unwrap_or("unknown");
        out.push(Comment {
            id: format!("commento_{}", c.comment_hex),
            parent_id: if c.parent_hex.is_empty() || c.parent_hex == "root" {
                String::new()
            } else {
                format!("commento_{}", c.parent_hex)
            },
            text: c.markdown.clone(),
            orig: c.markdown,
            user: User {
                id: format!(
                    "commento_{}",
                    hex::encode(Sha1::digest(c.commenter_hex.as_bytes()))
                ),
                name: name.to_string(),
                ..User::default()
            },
            locator: Locator::new(site, url),
            timestamp: c.creation_date,
            imported: true,
            ..Comment::default()
        });
    }
    debug!(comments = out.len(), "commento parse done");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
      "comments": [
        {
          "commentHex": "aa11",
          "path": "/post-one",
          "creationDate": "2019-01-01T10:00:00Z",
          "deleted": false,
          "markdown": "hello from commento",
          "commenterHex": "c-1",
          "parentHex": "root"
        },
        {
          "commentHex": "bb22",
          "path": "/post-one",
          "creationDate": "2019-01-01T11:00:00Z",
          "deleted": false,
          "markdown": "a reply",
          "commenterHex": "c-2",
          "parentHex": "aa11"
        },
        {
          "commentHex": "cc33",
          "path": "/post-one",
          "creationDate": "2019-01-01T12:00:00Z",
          "deleted": true,
          "markdown": "",
          "commenterHex": "c-1",
          "parentHex": "root"
        }
      ],
      "commenters": [
        {"commenterHex": "c-1", "name": "Carol"},
        {"commenterHex": "c-2", "name": "Dan"}
      ]
    }"#;

    #[test]
    fn parses_live_comments_and_resolves_names() {
        let comments = parse("site-1", "https://example.com", JSON).unwrap();
        assert_eq!(comments.len(), 2);

        let root = &comments[0];
        assert_eq!(root.id, "commento_aa11");
        assert_eq!(root.parent_id, "");
        assert_eq!(root.locator.url, "https://example.com/post-one");
        assert_eq!(root.user.name, "Carol");
        assert_eq!(
            root.user.id,
            format!("commento_{}", hex::encode(Sha1::digest(b"c-1")))
        );

        assert_eq!(comments[1].parent_id, "commento_aa11");
    }

    #[test]
    fn broken_json_is_a_validation_error() {
        assert!(matches!(
            parse("site-1", "https://example.com", "{oops"),
            Err(ParlorError::Validation(_))
        ));
    }
}
