// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Native export/import format: a meta header line followed by one comment
//! JSON object per line.
//!
//! ```text
//! {"version":1,"users":[...],"posts":[...]}
//! {"id":"...","pid":"...",...}
//! ```

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parlor_core::{Comment, ParlorError, PostMetaData, SortKey, UserMetaData};
use parlor_service::DataService;

pub const NATIVE_VERSION: u8 = 1;

/// First line of a native dump.
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub version: u8,
    pub users: Vec<UserMetaData>,
    pub posts: Vec<PostMetaData>,
}

/// Stream a full site dump: meta first, then topics oldest-first, each
/// topic's comments time-ascending. Returns the number of comments written.
pub async fn export(
    svc: &DataService,
    site: &str,
    out: &mut impl Write,
) -> Result<usize, ParlorError> {
    let (users, posts) = svc.metas(site).await?;
    let meta = Meta {
        version: NATIVE_VERSION,
        users,
        posts,
    };
    write_line(out, &meta)?;

    let mut topics = svc.engine().list(site, 0, 0).await?;
    topics.reverse(); // list is newest-first

    let mut written = 0;
    for topic in topics {
        let locator = parlor_core::Locator::new(site, topic.url);
        let comments = svc.engine().find(&locator, SortKey::default()).await?;
        for comment in comments {
            write_line(out, &comment)?;
            written += 1;
        }
    }
    info!(site, written, "export finished");
    Ok(written)
}

/// Load a native dump into an empty site: version gate, `delete_all`, one
/// `create` per line, flags restored at the end. Returns the saved count.
pub async fn import(
    svc: &DataService,
    site: &str,
    input: impl BufRead,
    cancel: &CancellationToken,
) -> Result<usize, ParlorError> {
    let mut lines = input.lines();
    let header = lines
        .next()
        .ok_or_else(|| ParlorError::Validation("empty import file".into()))?
        .map_err(ParlorError::storage)?;
    let meta: Meta = serde_json::from_str(&header)
        .map_err(|e| ParlorError::Validation(format!("broken import header: {e}")))?;
    if meta.version != NATIVE_VERSION {
        return Err(ParlorError::Validation(format!(
            "unexpected import file version {}",
            meta.version
        )));
    }

    svc.engine().delete_all(site).await?;

    let mut passed = 0usize;
    let mut failed = 0usize;
    for line in lines {
        if cancel.is_cancelled() {
            return Err(ParlorError::Internal("import cancelled".into()));
        }
        let line = line.map_err(ParlorError::storage)?;
        if line.trim().is_empty() {
            continue;
        }
        let mut comment: Comment = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "unparseable comment line skipped");
                failed += 1;
                continue;
            }
        };
        comment.locator.site = site.to_string();
        comment.imported = true;
        if let Err(e) = svc.engine().create(comment).await {
            warn!(error = %e, "comment rejected during import");
            failed += 1;
            continue;
        }
        passed += 1;
    }

    if passed == 0 {
        return Err(ParlorError::Validation("import failed".into()));
    }
    svc.set_metas(site, &meta.users, &meta.posts).await?;
    info!(site, passed, failed, "import finished");
    if failed > 0 {
        return Err(ParlorError::Internal(format!(
            "failed to save {failed} comments"
        )));
    }
    Ok(passed)
}

fn write_line<T: Serialize>(out: &mut impl Write, value: &T) -> Result<(), ParlorError> {
    serde_json::to_writer(&mut *out, value).map_err(ParlorError::storage)?;
    out.write_all(b"\n").map_err(ParlorError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_service, seeded_comment};
    use parlor_core::Locator;
    use std::io::BufReader;

    #[tokio::test]
    async fn export_import_round_trip_preserves_comments_and_flags() {
        let (svc, _dir) = new_service("site-1").await;
        let engine = svc.engine();

        engine
            .create(seeded_comment("c1", "", "https://example.com/p1", 10))
            .await
            .unwrap();
        engine
            .create(seeded_comment("c2", "c1", "https://example.com/p1", 20))
            .await
            .unwrap();
        engine
            .create(seeded_comment("c3", "", "https://example.com/p2", 30))
            .await
            .unwrap();
        engine.set_verified("site-1", "u1", true).await.unwrap();
        engine
            .set_read_only(&Locator::new("site-1", "https://example.com/p1"), true)
            .await
            .unwrap();

        let mut dump = Vec::new();
        let written = export(&svc, "site-1", &mut dump).await.unwrap();
        assert_eq!(written, 3);

        // restore into a fresh site
        let (fresh, _dir2) = new_service("site-1").await;
        let passed = import(
            &fresh,
            "site-1",
            BufReader::new(dump.as_slice()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(passed, 3);

        let restored = fresh
            .engine()
            .find(
                &Locator::new("site-1", "https://example.com/p1"),
                SortKey::default(),
            )
            .await
            .unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.iter().all(|c| c.imported));
        assert!(
            fresh
                .engine()
                .is_verified("site-1", "u1")
                .await
                .unwrap()
        );
        assert!(
            fresh
                .engine()
                .is_read_only(&Locator::new("site-1", "https://example.com/p1"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn version_gate_rejects_before_touching_data() {
        let (svc, _dir) = new_service("site-1").await;
        svc.engine()
            .create(seeded_comment("keep", "", "https://example.com/p1", 1))
            .await
            .unwrap();

        let dump = "{\"version\":2,\"users\":[],\"posts\":[]}\n{\"id\":\"x\"}\n";
        let err = import(
            &svc,
            "site-1",
            BufReader::new(dump.as_bytes()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("unexpected import file version 2"));

        // existing data untouched
        let count = svc
            .engine()
            .count(&Locator::new("site-1", "https://example.com/p1"))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn zero_saved_comments_is_an_import_failure() {
        let (svc, _dir) = new_service("site-1").await;
        let dump = "{\"version\":1,\"users\":[],\"posts\":[]}\nnot json\n";
        let err = import(
            &svc,
            "site-1",
            BufReader::new(dump.as_bytes()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("import failed"));
    }

    #[tokio::test]
    async fn partial_failures_are_reported() {
        let (svc, _dir) = new_service("site-1").await;
        let good = serde_json::to_string(&seeded_comment("c1", "", "https://example.com/p1", 1))
            .unwrap();
        let dump = format!("{{\"version\":1,\"users\":[],\"posts\":[]}}\n{good}\nbroken\n");
        let err = import(
            &svc,
            "site-1",
            BufReader::new(dump.as_bytes()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed to save 1 comments"));

        // the good comment still landed
        let count = svc
            .engine()
            .count(&Locator::new("site-1", "https://example.com/p1"))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
