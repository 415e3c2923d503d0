//! Batch resolution.
//!
//! A batch costs at most one local lookup per distinct key, one bulk read
//! against the distributed tier and one pipelined write back, however many
//! references it holds. Signer calls for the remaining misses run
//! concurrently. Results are index-aligned with the input.

use std::collections::{HashMap, HashSet};

use futures_util::future::join_all;
use mediaurl_storage::SignedUrl;

use crate::error::{ResolveError, ResolveResult};
use crate::metrics;
use crate::resolver::UrlResolver;

impl UrlResolver {
    /// Resolve many references at once.
    ///
    /// Equivalent to calling [`UrlResolver::resolve`] for each reference, but
    /// with batched tier access. If any signer call fails, entries that were
    /// signed are still cached, and the whole batch is retried one reference
    /// at a time; the first error of that retry fails the batch.
    pub async fn resolve_batch<S: AsRef<str>>(&self, references: &[S]) -> ResolveResult<Vec<String>> {
        let settled = self.run_batch(references).await;
        let failures = settled.iter().filter(|r| r.is_err()).count();
        if failures == 0 {
            return settled.into_iter().collect();
        }

        tracing::warn!(
            references = references.len(),
            failures,
            "batch fast path failed, resolving sequentially"
        );
        metrics::record_batch_fallback();

        let mut urls = Vec::with_capacity(references.len());
        for reference in references {
            urls.push(self.resolve(reference.as_ref()).await?);
        }
        Ok(urls)
    }

    /// Resolve many references, reporting failures per reference instead of
    /// failing the batch.
    pub async fn resolve_batch_settled<S: AsRef<str>>(
        &self,
        references: &[S],
    ) -> Vec<ResolveResult<String>> {
        self.run_batch(references).await
    }

    async fn run_batch<S: AsRef<str>>(&self, references: &[S]) -> Vec<ResolveResult<String>> {
        if references.is_empty() {
            return Vec::new();
        }

        let locators: Vec<_> = references
            .iter()
            .map(|r| self.parser.parse(r.as_ref()))
            .collect();
        let keys: Vec<Option<String>> = locators.iter().map(|l| l.cache_key()).collect();

        // Distinct keys in first-seen order, with the index of that reference.
        let mut seen = HashSet::new();
        let mut pending: Vec<(String, usize)> = keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| key.as_ref().map(|k| (k, i)))
            .filter(|(key, _)| seen.insert(*key))
            .map(|(key, i)| (key.clone(), i))
            .collect();
        let distinct = pending.len();

        let mut resolved: HashMap<String, SignedUrl> = HashMap::with_capacity(distinct);

        // L1
        pending.retain(|(key, _)| match self.local.get(key) {
            Some(entry) => {
                resolved.insert(key.clone(), entry);
                false
            }
            None => true,
        });
        let local_hits = resolved.len();
        for _ in 0..local_hits {
            metrics::record_cache_hit("local");
        }

        // L2, one deadline-bounded read for every local miss
        let mut distributed_hits = 0;
        if !pending.is_empty() && self.distributed.is_enabled() {
            let lookup: Vec<String> = pending.iter().map(|(key, _)| key.clone()).collect();
            let found = self.distributed.mget(&lookup).await;

            let mut misses = Vec::with_capacity(pending.len());
            for ((key, index), entry) in pending.into_iter().zip(found) {
                match entry {
                    Some(entry) => {
                        self.local.put(key.clone(), entry.clone());
                        resolved.insert(key, entry);
                        distributed_hits += 1;
                        metrics::record_cache_hit("distributed");
                    }
                    None => misses.push((key, index)),
                }
            }
            pending = misses;
        }

        // Origin
        metrics::record_cache_miss(pending.len() as u64);
        let signed = join_all(pending.iter().map(|(key, index)| {
            let reference = references[*index].as_ref();
            let locator = &locators[*index];
            async move { (key, self.sign(reference, locator, None).await) }
        }))
        .await;

        let mut failed: HashMap<String, ResolveError> = HashMap::new();
        let mut fresh: Vec<(String, SignedUrl)> = Vec::with_capacity(signed.len());
        for (key, result) in signed {
            match result {
                Ok(entry) => {
                    if self.local.put(key.clone(), entry.clone()) {
                        fresh.push((key.clone(), entry.clone()));
                    }
                    resolved.insert(key.clone(), entry);
                }
                Err(e) => {
                    failed.insert(key.clone(), e);
                }
            }
        }

        tracing::debug!(
            references = references.len(),
            distinct,
            local_hits,
            distributed_hits,
            signed = resolved.len() - local_hits - distributed_hits,
            failed = failed.len(),
            "batch resolved"
        );

        if !fresh.is_empty() && self.distributed.is_enabled() {
            let tier = self.distributed.clone();
            self.writer
                .submit("pipeline_set", async move { tier.pipeline_set(&fresh).await });
        }

        references
            .iter()
            .zip(keys)
            .map(|(reference, key)| {
                let Some(key) = key else {
                    return Ok(reference.as_ref().to_string());
                };
                match resolved.get(&key) {
                    Some(entry) => Ok(entry.url.clone()),
                    None => Err(failed.get(&key).cloned().unwrap_or_else(|| {
                        ResolveError::Config(format!("no result for {}", reference.as_ref()))
                    })),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mediaurl_memory::{HmacSigner, InMemoryDistributedCache};

    use crate::cache::{DistributedTier, LocalCache};
    use crate::resolver::UrlResolver;

    fn resolver() -> (UrlResolver, Arc<HmacSigner>, Arc<InMemoryDistributedCache>) {
        let signer = Arc::new(HmacSigner::new("https://files.test", "secret"));
        let backend = InMemoryDistributedCache::shared();
        let buffer = Duration::from_secs(300);
        let resolver = UrlResolver::new(
            signer.clone(),
            Arc::new(LocalCache::new(buffer, 100)),
            DistributedTier::new(backend.clone(), "signed-url:", Duration::from_secs(2), buffer),
        );
        (resolver, signer, backend)
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (resolver, signer, backend) = resolver();
        let refs: [&str; 0] = [];

        assert!(resolver.resolve_batch(&refs).await.unwrap().is_empty());
        assert_eq!(signer.calls(), 0);
        assert_eq!(backend.counts().mgets, 0);
    }

    #[tokio::test]
    async fn test_duplicates_signed_once() {
        let (resolver, signer, _) = resolver();
        let refs = ["store://a/1.png", "store://a/1.png", "store://a/2.png"];

        let urls = resolver.resolve_batch(&refs).await.unwrap();

        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], urls[1]);
        assert_ne!(urls[0], urls[2]);
        assert_eq!(signer.calls(), 2);
    }

    #[tokio::test]
    async fn test_mixed_opaque_and_resolvable() {
        let (resolver, signer, _) = resolver();
        let refs = vec![
            "https://cdn.example.com/logo.png".to_string(),
            "store://a/1.png".to_string(),
            String::new(),
        ];

        let urls = resolver.resolve_batch(&refs).await.unwrap();

        assert_eq!(urls[0], "https://cdn.example.com/logo.png");
        assert!(urls[1].starts_with("https://files.test/a/1.png?"));
        assert_eq!(urls[2], "");
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_pipelined_write_back() {
        let (resolver, _, backend) = resolver();

        resolver
            .resolve_batch(&["store://a/1.png", "store://a/2.png", "store://a/3.png"])
            .await
            .unwrap();
        resolver.flush_background_writes().await;

        let counts = backend.counts();
        assert_eq!(counts.mgets, 1);
        assert_eq!(counts.pipeline_sets, 1);
        assert_eq!(counts.sets, 0);
        assert_eq!(backend.len(), 3);
    }

    #[tokio::test]
    async fn test_settled_reports_per_reference() {
        let (resolver, signer, _) = resolver();
        signer.fail_on("bad.png").await;

        let results = resolver
            .resolve_batch_settled(&["store://a/good.png", "store://a/bad.png"])
            .await;

        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().sign_error().is_some());
        assert_eq!(resolver.local_cache().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_fails_batch() {
        let (resolver, signer, _) = resolver();
        signer.fail_on("bad.png").await;

        let err = resolver
            .resolve_batch(&["store://a/good.png", "store://a/bad.png"])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("store://a/bad.png"));
        // Fast path signs both; fallback reuses the cached good one and
        // retries the bad one.
        assert_eq!(signer.calls(), 3);
        assert!(resolver.local_cache().get("a/good.png").is_some());
    }

    #[tokio::test]
    async fn test_failed_key_is_signed_again_next_batch() {
        let (resolver, signer, _) = resolver();
        signer.fail_on("flaky.png").await;

        let first = resolver.resolve_batch_settled(&["store://a/flaky.png"]).await;
        assert!(first[0].is_err());

        signer.recover("flaky.png").await;
        let urls = resolver.resolve_batch(&["store://a/flaky.png"]).await.unwrap();

        assert_eq!(urls.len(), 1);
        assert_eq!(signer.calls(), 2);
    }
}
