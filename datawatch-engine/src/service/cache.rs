//! Existence cache
//!
//! Bounded store of confirmed "(path, principal) exists" facts. Entries are
//! evicted least-recently-used when the cache is full, and are treated as
//! absent once older than the TTL. Expired entries are dropped lazily on
//! lookup and actively by `purge_expired`, which the poller runs every cycle.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use datawatch_core::domain::check_key::CheckKey;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::clock::Clock;

/// Thread-safe LRU + TTL cache of confirmed existence facts
///
/// Lookups update recency, so reads also take the lock. No operation performs
/// I/O while holding it.
pub struct ExistenceCache {
    entries: Mutex<LruCache<CheckKey, DateTime<Utc>>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl ExistenceCache {
    /// Creates a cache holding at most `max_entries` facts for `ttl` each
    pub fn new(max_entries: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Records that `key` exists as of now
    pub fn put(&self, key: CheckKey) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key.clone(), now) {
            if evicted != key {
                debug!("Evicted least recently used entry {}", evicted);
            }
        }
    }

    /// Whether `key` is known to exist and has not outlived the TTL
    pub fn get(&self, key: &CheckKey) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let Some(confirmed_at) = entries.get(key).copied() else {
            return false;
        };
        if self.is_fresh(confirmed_at, now) {
            true
        } else {
            entries.pop(key);
            false
        }
    }

    /// Forgets `key`, returning whether it was present
    pub fn remove(&self, key: &CheckKey) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    /// Drops every entry older than the TTL, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired: Vec<CheckKey> = entries
            .iter()
            .filter(|(_, confirmed_at)| !self.is_fresh(**confirmed_at, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Number of physically stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, confirmed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(confirmed_at) <= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use std::thread;

    fn key(path: &str) -> CheckKey {
        CheckKey::new(path, "etl")
    }

    fn cache(max_entries: usize, ttl_secs: u64) -> (ExistenceCache, FakeClock) {
        let clock = FakeClock::default();
        let cache = ExistenceCache::new(
            max_entries,
            Duration::from_secs(ttl_secs),
            Arc::new(clock.clone()),
        );
        (cache, clock)
    }

    #[test]
    fn test_get_after_put() {
        let (cache, _) = cache(10, 60);
        assert!(!cache.get(&key("/a")));
        cache.put(key("/a"));
        assert!(cache.get(&key("/a")));
        assert!(!cache.get(&CheckKey::new("/a", "someone-else")));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache(10, 60);
        cache.put(key("/a"));

        clock.advance(Duration::from_secs(60));
        assert!(cache.get(&key("/a")));

        clock.advance(Duration::from_secs(1));
        assert!(!cache.get(&key("/a")));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_put_refreshes_confirmation_time() {
        let (cache, clock) = cache(10, 60);
        cache.put(key("/a"));
        clock.advance(Duration::from_secs(50));
        cache.put(key("/a"));
        clock.advance(Duration::from_secs(50));
        assert!(cache.get(&key("/a")));
    }

    #[test]
    fn test_capacity_evicts_least_recently_accessed() {
        let (cache, _) = cache(3, 60);
        cache.put(key("/a"));
        cache.put(key("/b"));
        cache.put(key("/c"));

        // touch /a so /b becomes the least recently used
        assert!(cache.get(&key("/a")));

        cache.put(key("/d"));
        assert_eq!(cache.len(), 3);
        assert!(!cache.get(&key("/b")));
        assert!(cache.get(&key("/a")));
        assert!(cache.get(&key("/c")));
        assert!(cache.get(&key("/d")));
    }

    #[test]
    fn test_remove() {
        let (cache, _) = cache(10, 60);
        cache.put(key("/a"));
        assert!(cache.remove(&key("/a")));
        assert!(!cache.remove(&key("/a")));
        assert!(!cache.get(&key("/a")));
    }

    #[test]
    fn test_purge_expired_drops_only_stale_entries() {
        let (cache, clock) = cache(10, 60);
        cache.put(key("/old"));
        clock.advance(Duration::from_secs(45));
        cache.put(key("/new"));
        clock.advance(Duration::from_secs(30));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("/new")));
    }

    #[test]
    fn test_concurrent_writer_and_readers() {
        let (cache, _) = cache(1_000, 60);
        let cache = Arc::new(cache);

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500 {
                    cache.put(key(&format!("/p/{}", i)));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..500 {
                        let _ = cache.get(&key(&format!("/p/{}", i)));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cache.len(), 500);
        assert!(cache.get(&key("/p/499")));
    }
}
