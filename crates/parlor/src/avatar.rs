// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process avatar migration between two stores.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use parlor_core::{AvatarStore, ParlorError};
use parlor_image::{FsAvatarStore, SqliteAvatarStore};

async fn open_store(kind: &str, path: &str) -> Result<Arc<dyn AvatarStore>, ParlorError> {
    match kind {
        "fs" => Ok(Arc::new(FsAvatarStore::new(path))),
        "sqlite" => Ok(Arc::new(SqliteAvatarStore::open(Path::new(path)).await?)),
        other => Err(ParlorError::Config(format!(
            "unknown avatar store kind {other:?}, expected fs or sqlite"
        ))),
    }
}

pub async fn run_avatar(
    from_kind: &str,
    from_path: &str,
    to_kind: &str,
    to_path: &str,
) -> Result<(), ParlorError> {
    let from = open_store(from_kind, from_path).await?;
    let to = open_store(to_kind, to_path).await?;
    let moved = parlor_image::migrate(from.as_ref(), to.as_ref()).await?;
    info!(from = from_kind, to = to_kind, moved, "avatar migration finished");
    Ok(())
}
