// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Short-TTL cache for successful upstream responses.
//!
//! Entries are keyed by a request signature derived verbatim from method
//! and full path + query string. Query parameter order is deliberately not
//! normalized: two orderings of the same parameters produce two entries,
//! which costs duplicate work but can never serve a wrong result.
//!
//! Expiry is lazy: `get` treats a stale entry as absent and drops it.
//! A periodic [`ResponseCache::sweep`] bounds memory under a long tail of
//! distinct signatures without changing read semantics.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    expires_at_ms: u64,
}

/// Thread-safe TTL response cache.
///
/// Only the call site knows whether the originating request succeeded, so
/// the store never filters on its own: callers must `put` success payloads
/// only. The `fromCache` marker on served hits is likewise the pipeline's
/// job, not the store's.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Build the cache signature for a request: `"{METHOD}:{path?query}"`,
    /// query string taken verbatim.
    pub fn signature(method: &str, path_and_query: &str) -> String {
        format!("{}:{}", method, path_and_query)
    }

    /// Look up a payload. Returns `None` if the signature is absent or the
    /// entry has expired; an expired entry is removed on the way out.
    pub async fn get(&self, signature: &str, now_ms: u64) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(signature) {
                Some(entry) if now_ms < entry.expires_at_ms => {
                    return Some(entry.payload.clone());
                }
                Some(_) => {} // stale, fall through to remove
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check under the write lock: a concurrent put may have
        // refreshed the entry since the read lock was released.
        if entries
            .get(signature)
            .is_some_and(|e| now_ms >= e.expires_at_ms)
        {
            debug!(signature, "dropping expired cache entry");
            entries.remove(signature);
        }
        None
    }

    /// Store a payload under `signature` for `ttl`. Overwrites any
    /// previous entry for the same signature.
    pub async fn put(&self, signature: impl Into<String>, payload: Value, ttl: Duration, now_ms: u64) {
        let signature = signature.into();
        let expires_at_ms = now_ms + ttl.as_millis() as u64;
        let mut entries = self.entries.write().await;
        entries.insert(
            signature,
            CacheEntry {
                payload,
                expires_at_ms,
            },
        );
    }

    /// Remove every expired entry. Returns the number removed.
    pub async fn sweep(&self, now_ms: u64) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now_ms < e.expires_at_ms);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, cached = entries.len(), "swept response cache");
        }
        removed
    }

    /// Number of entries currently stored, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
