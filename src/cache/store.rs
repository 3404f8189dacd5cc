//! Feed cache storage: get-or-compute over rendered bytes.
//!
//! At most one compute runs per identical key at a time; overlapping
//! callers wait on the in-flight build and share its stored result.
//! Failed computes are returned to their caller but never stored, so the
//! next request retries from scratch. Capacity eviction is LRU.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use super::keys::CacheKey;
use super::lock::rw_write;

const SOURCE: &str = "cache::store";

struct CachedFeed {
    bytes: Bytes,
    scopes: Vec<String>,
}

/// Scope-tagged LRU cache for rendered feed documents.
pub struct FeedCache {
    entries: RwLock<LruCache<String, CachedFeed>>,
    // One guard per key with a live build; retired when the last holder
    // finishes.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FeedCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached document for `key`, or run `compute` to produce it.
    ///
    /// Concurrent callers with the same key are coalesced: one runs
    /// `compute`, the rest block on the in-flight build and read its stored
    /// result. An `Err` from `compute` propagates to the caller that ran it
    /// and leaves the cache unchanged.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &CacheKey, compute: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if let Some(bytes) = self.lookup(key.id()) {
            debug!(key = key.id(), outcome = "hit", "serving cached feed");
            return Ok(bytes);
        }

        let slot = self.flight_slot(key.id()).await;
        let result = {
            let _build = slot.lock().await;
            // the build that won the race may have landed while this caller
            // waited on the guard
            match self.lookup(key.id()) {
                Some(bytes) => {
                    debug!(
                        key = key.id(),
                        outcome = "coalesced",
                        "sharing feed built by concurrent request"
                    );
                    Ok(bytes)
                }
                None => {
                    debug!(key = key.id(), outcome = "miss", "building feed");
                    let result = compute().await;
                    if let Ok(bytes) = &result {
                        self.insert(key, bytes.clone());
                    }
                    result
                }
            }
        };
        drop(slot);
        self.retire_flight_slot(key.id()).await;
        result
    }

    /// Drop every entry tagged with any of `scopes`; returns how many were
    /// purged. Called by the engine's write path when comments change.
    pub fn purge_scopes(&self, scopes: &[&str]) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "purge_scopes");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .scopes
                    .iter()
                    .any(|tag| scopes.contains(&tag.as_str()))
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &doomed {
            entries.pop(id);
        }
        if !doomed.is_empty() {
            debug!(?scopes, purged = doomed.len(), "purged scoped feed entries");
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, id: &str) -> Option<Bytes> {
        rw_write(&self.entries, SOURCE, "lookup")
            .get(id)
            .map(|entry| entry.bytes.clone())
    }

    fn insert(&self, key: &CacheKey, bytes: Bytes) {
        let entry = CachedFeed {
            bytes,
            scopes: key.scopes().to_vec(),
        };
        rw_write(&self.entries, SOURCE, "insert").put(key.id().to_string(), entry);
    }

    async fn flight_slot(&self, id: &str) -> Arc<Mutex<()>> {
        let mut flights = self.inflight.lock().await;
        Arc::clone(flights.entry(id.to_string()).or_default())
    }

    async fn retire_flight_slot(&self, id: &str) {
        let mut flights = self.inflight.lock().await;
        let last_holder = flights
            .get(id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if last_holder {
            flights.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(capacity: usize) -> FeedCache {
        FeedCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[derive(Debug, PartialEq)]
    struct BuildFailed;

    #[tokio::test]
    async fn miss_computes_then_hit_serves_without_compute() {
        let cache = small_cache(4);
        let key = CacheKey::last_comments("site-1", "/rss/site?site=site-1");

        let first: Result<Bytes, BuildFailed> = cache
            .get_or_compute(&key, || async { Ok(Bytes::from_static(b"doc")) })
            .await;
        assert_eq!(first.unwrap(), Bytes::from_static(b"doc"));

        let second: Result<Bytes, BuildFailed> = cache
            .get_or_compute(&key, || async { panic!("must not recompute on hit") })
            .await;
        assert_eq!(second.unwrap(), Bytes::from_static(b"doc"));
    }

    #[tokio::test]
    async fn failed_compute_is_not_stored() {
        let cache = small_cache(4);
        let key = CacheKey::last_comments("site-1", "/rss/site?site=site-1");

        let failed: Result<Bytes, BuildFailed> =
            cache.get_or_compute(&key, || async { Err(BuildFailed) }).await;
        assert_eq!(failed.unwrap_err(), BuildFailed);
        assert!(cache.is_empty());

        let retried: Result<Bytes, BuildFailed> = cache
            .get_or_compute(&key, || async { Ok(Bytes::from_static(b"ok")) })
            .await;
        assert_eq!(retried.unwrap(), Bytes::from_static(b"ok"));
    }

    #[tokio::test]
    async fn purge_scopes_drops_only_tagged_entries() {
        let cache = small_cache(8);
        let post_key = CacheKey::post_feed("site-1", "/rss/post?url=a", "https://s/a");
        let site_key = CacheKey::last_comments("site-1", "/rss/site");
        let other_key = CacheKey::last_comments("site-2", "/rss/site");

        for key in [&post_key, &site_key, &other_key] {
            let _: Result<Bytes, BuildFailed> = cache
                .get_or_compute(key, || async { Ok(Bytes::from_static(b"doc")) })
                .await;
        }
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.purge_scopes(&["site-1"]), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_scopes(&["https://s/a"]), 0);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = small_cache(2);
        for identity in ["/a", "/b", "/c"] {
            let key = CacheKey::last_comments("site-1", identity);
            let _: Result<Bytes, BuildFailed> = cache
                .get_or_compute(&key, || async { Ok(Bytes::from_static(b"doc")) })
                .await;
        }
        assert_eq!(cache.len(), 2);
    }
}
