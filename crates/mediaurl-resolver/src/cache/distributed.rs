//! Distributed (L2) tier guard.
//!
//! Wraps a [`DistributedCache`](mediaurl_storage::DistributedCache) backend
//! so that its failures never reach the resolver: transport and
//! (de)serialization errors are logged, counted, and reported as misses.
//!
//! The bulk read additionally runs under a fixed deadline. When the deadline
//! elapses first, every requested key is a miss and the in-flight read is
//! abandoned; it keeps running in its own task and its result is discarded.
//!
//! A tier built with [`DistributedTier::disabled`] has no backend and always
//! misses (local-only mode).

use std::sync::Arc;
use std::time::Duration;

use mediaurl_storage::{CacheError, DynDistributedCache, ErrorCategory, SignedUrl};
use time::OffsetDateTime;

use crate::metrics;

/// Guarded access to the shared cache tier.
#[derive(Clone)]
pub struct DistributedTier {
    backend: Option<DynDistributedCache>,
    key_prefix: Arc<str>,
    mget_deadline: Duration,
    safety_buffer: Duration,
}

impl DistributedTier {
    /// Create a tier over `backend`.
    pub fn new(
        backend: DynDistributedCache,
        key_prefix: impl Into<String>,
        mget_deadline: Duration,
        safety_buffer: Duration,
    ) -> Self {
        Self {
            backend: Some(backend),
            key_prefix: Arc::from(key_prefix.into()),
            mget_deadline,
            safety_buffer,
        }
    }

    /// Create a tier with no backend; every lookup misses and writes are
    /// dropped.
    pub fn disabled(safety_buffer: Duration) -> Self {
        Self {
            backend: None,
            key_prefix: Arc::from(""),
            mget_deadline: Duration::ZERO,
            safety_buffer,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn mget_deadline(&self) -> Duration {
        self.mget_deadline
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Decode a stored value and apply the safety buffer.
    fn decode(&self, key: &str, raw: Option<String>, now: OffsetDateTime) -> Option<SignedUrl> {
        let raw = raw?;
        match serde_json::from_str::<SignedUrl>(&raw) {
            Ok(entry) if entry.is_eligible_at(now, self.safety_buffer) => Some(entry),
            Ok(_) => {
                tracing::debug!(key = %key, "distributed entry within safety buffer, ignoring");
                None
            }
            Err(e) => {
                let e = CacheError::from(e);
                tracing::warn!(key = %key, error = %e, "undecodable distributed cache entry");
                metrics::record_distributed_error("decode", e.category());
                None
            }
        }
    }

    /// Read a single eligible entry. Failures are reported as a miss.
    pub async fn get(&self, key: &str) -> Option<SignedUrl> {
        let backend = self.backend.as_ref()?;
        match backend.get(&self.storage_key(key)).await {
            Ok(raw) => self.decode(key, raw, OffsetDateTime::now_utc()),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "distributed cache GET error");
                metrics::record_distributed_error("get", e.category());
                None
            }
        }
    }

    /// Read many entries under the bulk-read deadline.
    ///
    /// The result is aligned with `keys`. On backend failure or deadline
    /// every position is `None`.
    pub async fn mget(&self, keys: &[String]) -> Vec<Option<SignedUrl>> {
        let misses = || vec![None; keys.len()];
        let Some(backend) = self.backend.as_ref() else {
            return misses();
        };
        if keys.is_empty() {
            return Vec::new();
        }

        let storage_keys: Vec<String> = keys.iter().map(|k| self.storage_key(k)).collect();
        let backend = Arc::clone(backend);
        // Spawned so that a timed-out read is abandoned rather than cancelled.
        let handle = tokio::spawn(async move { backend.mget(&storage_keys).await });

        let raw = match tokio::time::timeout(self.mget_deadline, handle).await {
            Ok(Ok(Ok(values))) if values.len() == keys.len() => values,
            Ok(Ok(Ok(values))) => {
                tracing::warn!(
                    expected = keys.len(),
                    got = values.len(),
                    "distributed cache MGET returned misaligned result"
                );
                metrics::record_distributed_error("mget", ErrorCategory::Internal);
                return misses();
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(keys = keys.len(), error = %e, "distributed cache MGET error");
                metrics::record_distributed_error("mget", e.category());
                return misses();
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "distributed cache MGET task failed");
                metrics::record_distributed_error("mget", ErrorCategory::Internal);
                return misses();
            }
            Err(_) => {
                let e = CacheError::Timeout {
                    millis: self.mget_deadline.as_millis() as u64,
                };
                tracing::warn!(
                    keys = keys.len(),
                    error = %e,
                    "distributed cache MGET deadline exceeded, treating as miss"
                );
                metrics::record_distributed_timeout();
                return misses();
            }
        };

        let now = OffsetDateTime::now_utc();
        keys.iter()
            .zip(raw)
            .map(|(key, value)| self.decode(key, value, now))
            .collect()
    }

    /// Encode an entry for storage, with the TTL that keeps it only as long
    /// as it is servable. Returns `None` if there is nothing worth storing.
    fn encode(
        &self,
        key: &str,
        entry: &SignedUrl,
        now: OffsetDateTime,
    ) -> Option<(String, String, Duration)> {
        let ttl = entry.eligible_for(now, self.safety_buffer)?;
        // Redis TTLs have whole-second resolution.
        if ttl < Duration::from_secs(1) {
            return None;
        }
        match serde_json::to_string(entry) {
            Ok(value) => Some((self.storage_key(key), value, ttl)),
            Err(e) => {
                let e = CacheError::from(e);
                tracing::warn!(key = %key, error = %e, "failed to encode signed URL entry");
                metrics::record_distributed_error("encode", e.category());
                None
            }
        }
    }

    /// Write one entry. Returns the backend error for the caller to observe.
    pub async fn set(&self, key: &str, entry: &SignedUrl) -> Result<(), CacheError> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(());
        };
        let Some((storage_key, value, ttl)) = self.encode(key, entry, OffsetDateTime::now_utc())
        else {
            return Ok(());
        };
        backend.set(&storage_key, &value, ttl).await
    }

    /// Write many entries in one round trip.
    pub async fn pipeline_set(&self, entries: &[(String, SignedUrl)]) -> Result<(), CacheError> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(());
        };
        let now = OffsetDateTime::now_utc();
        let encoded: Vec<(String, String, Duration)> = entries
            .iter()
            .filter_map(|(key, entry)| self.encode(key, entry, now))
            .collect();
        if encoded.is_empty() {
            return Ok(());
        }
        backend.pipeline_set(&encoded).await
    }

    /// Check backend connectivity. A disabled tier reports `false`.
    pub async fn is_available(&self) -> bool {
        match self.backend.as_ref() {
            Some(backend) => backend.ping().await.is_ok(),
            None => false,
        }
    }
}
