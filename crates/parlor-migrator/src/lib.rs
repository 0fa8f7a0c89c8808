// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data migration: native export/import, foreign importers (Disqus,
//! WordPress, Commento) and URL remapping.

pub mod commento;
pub mod disqus;
pub mod native;
pub mod remap;
pub mod wordpress;

pub use native::{Meta, NATIVE_VERSION, export, import};
pub use remap::{UrlMapper, remap};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parlor_core::{Comment, ParlorError};
use parlor_service::DataService;

/// Replace the site's content with comments from a foreign importer. Same
/// contract as the native import: the site is wiped first, bad records are
/// counted, zero saved comments is a failure.
pub async fn import_comments(
    svc: &DataService,
    site: &str,
    comments: Vec<Comment>,
    cancel: &CancellationToken,
) -> Result<usize, ParlorError> {
    svc.engine().delete_all(site).await?;

    let mut passed = 0usize;
    let mut failed = 0usize;
    for mut comment in comments {
        if cancel.is_cancelled() {
            return Err(ParlorError::Internal("import cancelled".into()));
        }
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
    info!(site, passed, failed, "import finished");
    if failed > 0 {
        return Err(ParlorError::Internal(format!(
            "failed to save {failed} comments"
        )));
    }
    Ok(passed)
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::{new_service, seeded_comment};

    #[tokio::test]
    async fn foreign_import_replaces_existing_content() {
        let (svc, _dir) = new_service("site-1").await;
        svc.engine()
            .create(seeded_comment("stale", "", "https://example.com/old", 1))
            .await
            .unwrap();

        let incoming = vec![
            seeded_comment("n1", "", "https://example.com/p1", 10),
            seeded_comment("n2", "n1", "https://example.com/p1", 20),
        ];
        let saved = import_comments(&svc, "site-1", incoming, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(saved, 2);

        let stale = svc
            .engine()
            .count(&parlor_core::Locator::new("site-1", "https://example.com/old"))
            .await
            .unwrap();
        assert_eq!(stale, 0);
    }

    #[tokio::test]
    async fn empty_foreign_import_fails() {
        let (svc, _dir) = new_service("site-1").await;
        let err = import_comments(&svc, "site-1", vec![], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("import failed"));
    }
}
