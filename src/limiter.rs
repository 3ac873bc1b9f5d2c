// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter keyed by client identity.
//!
//! Each client key owns one counter inside a fixed time window. The counter
//! resets when the window ends; it does not slide. A client straddling a
//! window boundary can therefore burst up to twice the configured maximum —
//! that trade-off is intentional and callers needing smoother limiting
//! should layer something else on top.
//!
//! Timestamps are unix-epoch milliseconds supplied by the caller, which
//! keeps admission decisions deterministic under test.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Counter state for one client key.
#[derive(Debug)]
struct ClientWindow {
    count: u32,
    reset_at_ms: u64,
}

/// Outcome of one admission check.
///
/// `limit`, `remaining` and `reset_at_ms` are always populated so the
/// caller can emit rate-limit headers on allowed requests and a
/// retry-after on rejected ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
}

impl Admission {
    /// Whole seconds until the window resets, rounded up, never zero for a
    /// rejection inside a live window.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }

    /// Epoch seconds of the window end, for the X-RateLimit-Reset header.
    pub fn reset_epoch_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }
}

/// Thread-safe fixed-window rate limiter.
///
/// The window map is owned by this struct and only ever touched under its
/// lock; `admit` holds the write lock for the whole read-modify-write so
/// two concurrent calls for one key can never both observe pre-increment
/// state.
pub struct RateLimiter {
    limit: u32,
    window_ms: u64,
    windows: RwLock<HashMap<String, ClientWindow>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limit: config.max_requests_per_window,
            window_ms: config.window_secs.saturating_mul(1000),
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Count a request against `key` and decide whether it is admitted.
    ///
    /// Every call mutates exactly one window, allowed or not: a fresh or
    /// expired window restarts at count 1, a live window increments. Over
    /// the limit the count keeps rising but `reset_at_ms` stays fixed, so
    /// a rejected client learns a stable retry horizon.
    pub async fn admit(&self, key: &str, now_ms: u64) -> Admission {
        let mut windows = self.windows.write().await;

        match windows.get_mut(key) {
            Some(window) if now_ms < window.reset_at_ms => {
                window.count += 1;
                let allowed = window.count <= self.limit;
                if !allowed {
                    debug!(key, count = window.count, "rate limit exceeded");
                }
                Admission {
                    allowed,
                    limit: self.limit,
                    remaining: self.limit.saturating_sub(window.count),
                    reset_at_ms: window.reset_at_ms,
                }
            }
            _ => {
                let reset_at_ms = now_ms + self.window_ms;
                windows.insert(
                    key.to_string(),
                    ClientWindow {
                        count: 1,
                        reset_at_ms,
                    },
                );
                Admission {
                    allowed: true,
                    limit: self.limit,
                    remaining: self.limit.saturating_sub(1),
                    reset_at_ms,
                }
            }
        }
    }

    /// Remove windows that expired more than one window ago.
    ///
    /// The grace window means a counter that just rolled over is never
    /// deleted out from under a concurrent `admit`; read semantics are
    /// unchanged because an expired window is reset on next touch anyway.
    /// Returns the number of entries removed.
    pub async fn sweep(&self, now_ms: u64) -> usize {
        let mut windows = self.windows.write().await;
        let before = windows.len();
        let horizon = self.window_ms;
        windows.retain(|_, w| now_ms < w.reset_at_ms.saturating_add(horizon));
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, tracked = windows.len(), "swept rate limiter windows");
        }
        removed
    }

    /// Number of client keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests_per_window: max,
            window_secs,
        })
    }

    #[tokio::test]
    async fn test_admits_up_to_limit() {
        let limiter = limiter(3, 60);
        for i in 0..3 {
            let admission = limiter.admit("10.0.0.1", 1_000).await;
            assert!(admission.allowed, "request {} should be admitted", i + 1);
            assert_eq!(admission.remaining, 2 - i);
        }
        let admission = limiter.admit("10.0.0.1", 1_000).await;
        assert!(!admission.allowed);
        assert_eq!(admission.remaining, 0);
    }

    #[tokio::test]
    async fn test_rejection_reports_retry_after() {
        let limiter = limiter(1, 60);
        let first = limiter.admit("k", 0).await;
        assert!(first.allowed);
        let second = limiter.admit("k", 30_000).await;
        assert!(!second.allowed);
        assert_eq!(second.reset_at_ms, 60_000);
        assert_eq!(second.retry_after_secs(30_000), 30);
    }

    #[tokio::test]
    async fn test_window_rollover_resets_count() {
        let limiter = limiter(2, 60);
        limiter.admit("k", 0).await;
        limiter.admit("k", 0).await;
        assert!(!limiter.admit("k", 59_999).await.allowed);

        // At the reset instant the window restarts at count 1.
        let admission = limiter.admit("k", 60_000).await;
        assert!(admission.allowed);
        assert_eq!(admission.remaining, 1);
        assert_eq!(admission.reset_at_ms, 120_000);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let limiter = limiter(1, 60);
        assert!(limiter.admit("a", 0).await.allowed);
        assert!(!limiter.admit("a", 1).await.allowed);
        assert!(limiter.admit("b", 2).await.allowed);
    }

    #[tokio::test]
    async fn test_rejected_calls_still_mutate_window() {
        let limiter = limiter(1, 60);
        limiter.admit("k", 0).await;
        limiter.admit("k", 1).await;
        limiter.admit("k", 2).await;
        // Three calls happened; remaining stays clamped at zero.
        let admission = limiter.admit("k", 3).await;
        assert_eq!(admission.remaining, 0);
        assert!(!admission.allowed);
    }

    #[tokio::test]
    async fn test_sweep_removes_long_expired_windows() {
        let limiter = limiter(10, 60);
        limiter.admit("old", 0).await;
        limiter.admit("fresh", 100_000).await;
        assert_eq!(limiter.tracked_keys().await, 2);

        // "old" reset at 60s; with one window of grace it is removable
        // from 120s onward. 130s clears it, "fresh" (reset 160s) stays.
        let removed = limiter.sweep(130_000).await;
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_spares_recently_expired_windows() {
        let limiter = limiter(10, 60);
        limiter.admit("k", 0).await;
        // Expired at 60s but still inside the grace window at 90s.
        assert_eq!(limiter.sweep(90_000).await, 0);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_admissions_never_lose_counts() {
        use std::sync::Arc;

        let limiter = Arc::new(limiter(50, 60));
        let mut handles = Vec::new();
        for _ in 0..100 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(
                async move { limiter.admit("shared", 1_000).await },
            ));
        }
        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 50, "exactly the limit must be admitted");
    }
}
