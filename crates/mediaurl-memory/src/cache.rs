//! In-memory [`DistributedCache`] with per-entry TTL.
//!
//! Stands in for Redis in single-node development setups and in tests. Two
//! processes never share it, so it only models the distributed tier's API
//! and TTL semantics, not its cross-process visibility.
//!
//! Fault injection hooks (`set_mget_delay`, `set_failing`) let tests exercise
//! the resolver's degradation paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use mediaurl_storage::{CacheError, DistributedCache};
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

/// Operation counters, for assertions in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: u64,
    pub mgets: u64,
    pub sets: u64,
    pub pipeline_sets: u64,
}

/// In-memory distributed cache backed by `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryDistributedCache {
    entries: DashMap<String, StoredValue>,
    mget_delay: RwLock<Option<Duration>>,
    failing: AtomicBool,
    gets: AtomicU64,
    mgets: AtomicU64,
    sets: AtomicU64,
    pipeline_sets: AtomicU64,
}

impl InMemoryDistributedCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache wrapped in `Arc` for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Delays every `mget` by `delay` before answering.
    pub async fn set_mget_delay(&self, delay: Option<Duration>) {
        *self.mget_delay.write().await = delay;
    }

    /// Makes every operation fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` holds an unexpired value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    /// Remaining TTL of `key`, if present.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now)
    }

    pub fn counts(&self) -> OperationCounts {
        OperationCounts {
            gets: self.gets.load(Ordering::Relaxed),
            mgets: self.mgets.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            pipeline_sets: self.pipeline_sets.load(Ordering::Relaxed),
        }
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::connection("in-memory cache marked unavailable"));
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn write(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl DistributedCache for InMemoryDistributedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.read(key))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        self.mgets.fetch_add(1, Ordering::Relaxed);
        let delay = *self.mget_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(keys.iter().map(|k| self.read(k)).collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.write(key, value, ttl);
        Ok(())
    }

    async fn pipeline_set(&self, entries: &[(String, String, Duration)]) -> Result<(), CacheError> {
        self.pipeline_sets.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        for (key, value, ttl) in entries {
            self.write(key, value, *ttl);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryDistributedCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(cache.get("missing").await.unwrap(), None);
        assert_eq!(cache.counts().gets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = InMemoryDistributedCache::new();
        cache.set("k", "v", Duration::from_secs(10)).await.unwrap();
        assert!(cache.contains_key("k"));

        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(!cache.contains_key("k"));
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mget_is_aligned() {
        let cache = InMemoryDistributedCache::new();
        cache
            .pipeline_set(&[
                ("a".into(), "1".into(), Duration::from_secs(60)),
                ("c".into(), "3".into(), Duration::from_secs(60)),
            ])
            .await
            .unwrap();

        let values = cache
            .mget(&["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some("1".into()), None, Some("3".into())]);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let cache = InMemoryDistributedCache::new();
        cache.set_failing(true);

        assert!(cache.get("k").await.is_err());
        assert!(cache.ping().await.is_err());

        cache.set_failing(false);
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mget_delay() {
        let cache = InMemoryDistributedCache::new();
        cache.set_mget_delay(Some(Duration::from_secs(3))).await;

        let started = Instant::now();
        cache.mget(&["a".into()]).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
