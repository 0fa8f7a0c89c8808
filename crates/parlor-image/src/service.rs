// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image service: validation, downscaling and the two-phase lifecycle over a
//! pluggable [`ImageStore`] backend.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::ImageReader;
use image::imageops::FilterType;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parlor_core::{ImageStore, ParlorError};

/// Size and dimension limits for uploads.
#[derive(Debug, Clone)]
pub struct ImageLimits {
    pub max_size: usize,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_size: 5 * 1024 * 1024,
            max_width: 2400,
            max_height: 900,
        }
    }
}

pub struct ImageService {
    store: Arc<dyn ImageStore>,
    limits: ImageLimits,
}

impl ImageService {
    pub fn new(store: Arc<dyn ImageStore>, limits: ImageLimits) -> Self {
        Self { store, limits }
    }

    /// Validate, decode, downscale when oversized, and write to staging.
    /// Returns the generated image id.
    pub async fn save_staging(&self, data: &[u8]) -> Result<String, ParlorError> {
        if data.len() > self.limits.max_size {
            return Err(ParlorError::Validation(format!(
                "image exceeds {} bytes",
                self.limits.max_size
            )));
        }
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ParlorError::Validation(format!("unreadable image: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| ParlorError::Validation("unknown image format".into()))?;
        let decoded = reader
            .decode()
            .map_err(|e| ParlorError::Validation(format!("broken image: {e}")))?;

        let id = uuid::Uuid::new_v4().to_string();
        if decoded.width() > self.limits.max_width || decoded.height() > self.limits.max_height {
            let resized = decoded.resize(
                self.limits.max_width,
                self.limits.max_height,
                FilterType::Lanczos3,
            );
            let mut out = Cursor::new(Vec::new());
            resized
                .write_to(&mut out, format)
                .map_err(|e| ParlorError::Internal(format!("image re-encode: {e}")))?;
            self.store.save(&id, &out.into_inner()).await?;
        } else {
            self.store.save(&id, data).await?;
        }
        Ok(id)
    }

    /// Move the referenced images out of staging. Per-id failures are logged
    /// and do not abort the rest; a comment may legitimately reference an
    /// image committed by an earlier edit.
    pub async fn commit(&self, ids: &[String]) -> Result<(), ParlorError> {
        for id in ids {
            if let Err(e) = self.store.commit(id).await {
                warn!(id = %id, error = %e, "image commit failed");
            }
        }
        Ok(())
    }

    pub async fn load(&self, id: &str) -> Result<Vec<u8>, ParlorError> {
        self.store.load(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ParlorError> {
        self.store.delete(id).await
    }

    /// Run the staging sweep every `ttl / 2` until cancelled.
    pub fn start_cleanup(self: &Arc<Self>, ttl: Duration, token: CancellationToken) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(ttl / 2);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => match service.store.cleanup(ttl).await {
                        Ok(0) => {}
                        Ok(removed) => info!(removed, "staging images swept"),
                        Err(e) => warn!(error = %e, "image cleanup failed"),
                    },
                }
            }
        });
    }
}

/// Pull image ids out of rendered comment HTML: every `<img src>` under the
/// given API prefix references a staged upload by id.
pub fn referenced_ids(html: &str, api_prefix: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r#"(?i)<img\s[^>]*?src="([^"]+)""#) else {
        return Vec::new();
    };
    re.captures_iter(html)
        .filter_map(|caps| {
            caps[1]
                .strip_prefix(api_prefix)
                .map(|rest| rest.trim_start_matches('/').to_string())
        })
        .filter(|id| !id.is_empty())
        .collect()
}
