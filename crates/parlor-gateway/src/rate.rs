// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-client token bucket applied to write routes.

use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;

/// Bucket count above which idle entries are reclaimed. The client key comes
/// from request headers, so the map must not grow with attacker input.
const MAX_BUCKETS: usize = 10_000;

/// Buckets untouched for this long are dropped during a reap; an idle bucket
/// has fully refilled anyway, so dropping it loses nothing.
const IDLE_REAP: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Token bucket per client key, refilled at `rate` per second with a burst
/// of `max(1, rate)`. Buckets are created lazily; once the map reaches
/// capacity, idle buckets are reclaimed before a new key is admitted.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    rate: f64,
    burst: f64,
    max_buckets: usize,
    idle_reap: Duration,
}

impl RateLimiter {
    pub fn new(rate_per_sec: f64) -> Self {
        Self::bounded(rate_per_sec, MAX_BUCKETS, IDLE_REAP)
    }

    fn bounded(rate_per_sec: f64, max_buckets: usize, idle_reap: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            rate: rate_per_sec,
            burst: rate_per_sec.max(1.0),
            max_buckets,
            idle_reap,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        if self.buckets.len() >= self.max_buckets && !self.buckets.contains_key(key) {
            self.reap(now);
            // fail closed: refuse new keys rather than grow past the cap
            if self.buckets.len() >= self.max_buckets {
                return false;
            }
        }
        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last: now,
        });
        let elapsed = now.duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn reap(&self, now: Instant) {
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last) < self.idle_reap);
    }
}

/// Client address for throttling: first hop of `X-Forwarded-For`, then
/// `X-Real-IP`, then a shared fallback key.
pub fn client_key(headers: &HeaderMap) -> String {
    if let Some(fwd) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = fwd.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real.is_empty() {
            return real.to_string();
        }
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_deny() {
        let limiter = RateLimiter::new(2.0);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        // independent bucket
        assert!(limiter.allow("b"));
    }

    #[test]
    fn refill_restores_tokens() {
        let limiter = RateLimiter::new(1000.0);
        for _ in 0..1000 {
            assert!(limiter.allow("a"));
        }
        assert!(!limiter.allow("a"));
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(limiter.allow("a"));
    }

    #[test]
    fn idle_buckets_reclaimed_at_capacity() {
        let limiter = RateLimiter::bounded(1.0, 2, Duration::from_millis(10));
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));
        std::thread::sleep(Duration::from_millis(20));

        // at capacity with both buckets idle; the new key evicts them
        assert!(limiter.allow("c"));
        assert!(limiter.buckets.len() <= 2);
        assert!(limiter.buckets.contains_key("c"));
    }

    #[test]
    fn full_map_of_active_buckets_refuses_new_keys() {
        let limiter = RateLimiter::bounded(1.0, 2, Duration::from_secs(60));
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));

        // both buckets are fresh, so a new key cannot grow the map
        assert!(!limiter.allow("c"));
        assert_eq!(limiter.buckets.len(), 2);
        // known keys keep their buckets
        assert!(limiter.buckets.contains_key("a"));
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_key(&headers), "10.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_key(&headers), "10.0.0.9");

        assert_eq!(client_key(&HeaderMap::new()), "unknown");
    }
}
