//! Process-local (L1) signed URL cache.
//!
//! Entries keep the expiry granted by the distributed tier or the signer;
//! the local tier never extends it. A lookup applies the safety buffer, so an
//! entry that is about to lapse is reported absent and dropped even if its
//! nominal expiry is still in the future.
//!
//! The table is bounded by `max_entries`. When full, expired entries are
//! swept first; if that frees nothing the entry closest to expiry is evicted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use mediaurl_storage::SignedUrl;
use time::OffsetDateTime;

/// Local cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalCacheStats {
    /// Number of entries currently held (including not-yet-swept garbage).
    pub size: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed by expiry checks, sweeps, or capacity eviction.
    pub evictions: u64,
}

impl LocalCacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Local signed URL cache using DashMap.
///
/// Thread-safe and shared across tasks behind an `Arc`. Entries are replaced
/// wholesale, never mutated, so concurrent readers and writers of one key
/// need no extra locking.
pub struct LocalCache {
    entries: DashMap<String, SignedUrl>,
    safety_buffer: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LocalCache {
    /// Create a new local cache.
    ///
    /// # Arguments
    ///
    /// * `safety_buffer` - Entries expiring within this margin are not served
    /// * `max_entries` - Upper bound on the number of entries held
    pub fn new(safety_buffer: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            safety_buffer,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn safety_buffer(&self) -> Duration {
        self.safety_buffer
    }

    /// Get an eligible entry.
    ///
    /// Returns `None` if the key is absent or its entry is within the safety
    /// buffer of expiry; in the latter case the stale entry is removed.
    pub fn get(&self, key: &str) -> Option<SignedUrl> {
        let now = OffsetDateTime::now_utc();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_eligible_at(now, self.safety_buffer) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.clone());
            }
            drop(entry);
            // Only drop it if nobody replaced it in the meantime.
            if self
                .entries
                .remove_if(key, |_, e| !e.is_eligible_at(now, self.safety_buffer))
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store an entry.
    ///
    /// Entries that are already inside the safety buffer are not stored.
    /// Returns `true` if the entry was stored.
    pub fn put(&self, key: impl Into<String>, entry: SignedUrl) -> bool {
        let now = OffsetDateTime::now_utc();
        if !entry.is_eligible_at(now, self.safety_buffer) {
            return false;
        }

        let key = key.into();
        if self.entries.insert(key.clone(), entry).is_some() {
            return true;
        }

        // Other writers may have inserted concurrently, so keep evicting
        // until the table is back within bounds.
        while self.entries.len() > self.max_entries {
            if !self.make_room(now, &key) {
                break;
            }
        }
        true
    }

    /// Remove entries that are no longer eligible.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(OffsetDateTime::now_utc())
    }

    fn cleanup_expired_at(&self, now: OffsetDateTime) -> usize {
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            if entry.is_eligible_at(now, self.safety_buffer) {
                true
            } else {
                removed += 1;
                false
            }
        });

        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }

        removed
    }

    /// Free at least one slot, never evicting `keep`. Returns `false` if
    /// nothing could be removed.
    fn make_room(&self, now: OffsetDateTime, keep: &str) -> bool {
        if self.cleanup_expired_at(now) > 0 {
            return true;
        }

        let soonest = self
            .entries
            .iter()
            .filter(|e| e.key() != keep)
            .min_by_key(|e| e.value().expires_at)
            .map(|e| e.key().clone());

        let Some(victim) = soonest else {
            return false;
        };
        if self.entries.remove(&victim).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                key = %victim,
                max_entries = self.max_entries,
                "local cache at capacity, evicted entry closest to expiry"
            );
        }
        // Losing the race to another evictor still made room.
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get cache statistics for monitoring.
    pub fn stats(&self) -> LocalCacheStats {
        LocalCacheStats {
            size: self.entries.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry_expiring_in(secs: i64) -> SignedUrl {
        SignedUrl::new(
            format!("https://signed/{secs}"),
            OffsetDateTime::now_utc() + time::Duration::seconds(secs),
        )
    }

    #[test]
    fn test_put_and_get() {
        let cache = LocalCache::new(Duration::from_secs(60), 100);
        let entry = entry_expiring_in(3600);

        assert!(cache.put("bucket/a.jpg", entry.clone()));
        assert_eq!(cache.get("bucket/a.jpg"), Some(entry));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_cache_miss() {
        let cache = LocalCache::new(Duration::from_secs(60), 100);

        assert!(cache.get("nonexistent").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_entry_within_safety_buffer_is_absent() {
        let cache = LocalCache::new(Duration::from_secs(300), 100);

        // Store directly to bypass the put-time check.
        cache
            .entries
            .insert("k".to_string(), entry_expiring_in(120));

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_put_rejects_entry_within_safety_buffer() {
        let cache = LocalCache::new(Duration::from_secs(300), 100);

        assert!(!cache.put("k", entry_expiring_in(299)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = LocalCache::new(Duration::from_secs(60), 100);
        cache.entries.insert("old-1".into(), entry_expiring_in(-10));
        cache.entries.insert("old-2".into(), entry_expiring_in(30));
        cache.put("fresh", entry_expiring_in(3600));

        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }

    #[test]
    fn test_capacity_evicts_soonest_expiry() {
        let cache = LocalCache::new(Duration::from_secs(60), 2);
        cache.put("a", entry_expiring_in(1000));
        cache.put("b", entry_expiring_in(500));
        cache.put("c", entry_expiring_in(2000));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_capacity_prefers_sweeping_expired() {
        let cache = LocalCache::new(Duration::from_secs(60), 2);
        cache.put("a", entry_expiring_in(1000));
        cache.entries.insert("stale".into(), entry_expiring_in(10));

        cache.put("b", entry_expiring_in(500));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let cache = LocalCache::new(Duration::from_secs(60), 1);
        cache.put("a", entry_expiring_in(1000));
        let newer = entry_expiring_in(2000);
        cache.put("a", newer.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(newer));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_new_entry_survives_even_if_soonest() {
        let cache = LocalCache::new(Duration::from_secs(60), 2);
        cache.put("a", entry_expiring_in(1000));
        cache.put("b", entry_expiring_in(2000));
        cache.put("c", entry_expiring_in(500));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("c").is_some());
        assert!(cache.get("a").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_bound_holds_under_concurrent_puts() {
        let cache = Arc::new(LocalCache::new(Duration::from_secs(60), 10));

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for i in 0..2000 {
                        cache.put(format!("w{w}/k{i}"), entry_expiring_in(3600 + i));
                        if i % 100 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        assert!(cache.len() <= 10, "len = {}", cache.len());
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_hit_rate_calculation() {
        let stats = LocalCacheStats {
            size: 10,
            max_entries: 100,
            hits: 75,
            misses: 25,
            evictions: 5,
        };

        assert!((stats.hit_rate() - 75.0).abs() < 0.001);

        let empty_stats = LocalCacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
