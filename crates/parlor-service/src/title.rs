// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page title extractor.
//!
//! Fetches the page, pulls the first `<title>` text, collapses whitespace.
//! Results are cached for 15 minutes, including failures: an unreachable
//! page caches an empty title so it is not re-fetched within the window.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use regex::Regex;
use tracing::debug;

use parlor_core::ParlorError;

const CACHE_KEYS: usize = 1000;
const CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TitleExtractor {
    client: reqwest::Client,
    title_re: Regex,
    cache: Mutex<LruCache<String, (String, Instant)>>,
}

impl TitleExtractor {
    pub fn new() -> Result<Self, ParlorError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ParlorError::Http {
                message: "title extractor client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            title_re: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
                .map_err(|e| ParlorError::Internal(e.to_string()))?,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_KEYS).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// Best-effort page title for `url`; empty string when unavailable.
    pub async fn get(&self, url: &str) -> String {
        if let Some(cached) = self.cached(url) {
            return cached;
        }
        let title = self.fetch(url).await;
        if title.is_empty() {
            debug!(url, "no title extracted");
        }
        let mut cache = self.lock();
        cache.put(url.to_string(), (title.clone(), Instant::now()));
        title
    }

    fn cached(&self, url: &str) -> Option<String> {
        let mut cache = self.lock();
        match cache.get(url) {
            Some((title, at)) if at.elapsed() < CACHE_TTL => Some(title.clone()),
            Some(_) => {
                cache.pop(url);
                None
            }
            None => None,
        }
    }

    async fn fetch(&self, url: &str) -> String {
        let body = match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => body,
                Err(_) => return String::new(),
            },
            _ => return String::new(),
        };
        self.title_re
            .captures(&body)
            .map(|caps| collapse_whitespace(&caps[1]))
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, (String, Instant)>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
