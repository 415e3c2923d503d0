//! Single-reference resolution and the attachment variant.

use std::sync::Arc;
use std::time::Duration;

use mediaurl_storage::{DynSigner, LocatorParser, ObjectLocator, SignedUrl};

use crate::background::BackgroundWriter;
use crate::cache::{DistributedTier, LocalCache, LocalCacheStats};
use crate::error::{ResolveError, ResolveResult};
use crate::metrics;

/// Default validity requested from the signer.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

/// Filename used when sanitization leaves nothing usable.
const FALLBACK_FILENAME: &str = "download";

/// Snapshot of resolver state for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverStats {
    pub local: LocalCacheStats,
    pub distributed_enabled: bool,
    pub background_in_flight: usize,
    pub background_max_in_flight: usize,
}

/// Resolves storage references into time-limited signed URLs.
///
/// Lookups go local tier, then distributed tier, then signer. The resolver is
/// cheap to share behind an `Arc`; all state lives in the injected tiers.
pub struct UrlResolver {
    pub(crate) parser: LocatorParser,
    pub(crate) local: Arc<LocalCache>,
    pub(crate) distributed: DistributedTier,
    pub(crate) signer: DynSigner,
    pub(crate) writer: BackgroundWriter,
    pub(crate) url_ttl: Duration,
    pub(crate) default_container: String,
}

impl UrlResolver {
    /// Create a resolver with default parsing rules, TTL and container.
    pub fn new(signer: DynSigner, local: Arc<LocalCache>, distributed: DistributedTier) -> Self {
        Self {
            parser: LocatorParser::default(),
            local,
            distributed,
            signer,
            writer: BackgroundWriter::default(),
            url_ttl: DEFAULT_URL_TTL,
            default_container: "media".to_string(),
        }
    }

    pub fn with_parser(mut self, parser: LocatorParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Container used when signing legacy references.
    pub fn with_default_container(mut self, container: impl Into<String>) -> Self {
        self.default_container = container.into();
        self
    }

    pub fn with_background_writer(mut self, writer: BackgroundWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn local_cache(&self) -> &Arc<LocalCache> {
        &self.local
    }

    pub fn distributed(&self) -> &DistributedTier {
        &self.distributed
    }

    /// Resolve one reference to a URL.
    ///
    /// Unrecognized references are returned unchanged without touching any
    /// tier. Cache failures degrade to a signer call; only a signer failure
    /// is an error.
    pub async fn resolve(&self, reference: &str) -> ResolveResult<String> {
        let locator = self.parser.parse(reference);
        let Some(key) = locator.cache_key() else {
            return Ok(reference.to_string());
        };

        if let Some(entry) = self.local.get(&key) {
            metrics::record_cache_hit("local");
            tracing::trace!(key = %key, "local cache hit");
            return Ok(entry.url);
        }

        if let Some(entry) = self.distributed.get(&key).await {
            metrics::record_cache_hit("distributed");
            tracing::trace!(key = %key, "distributed cache hit");
            self.local.put(key, entry.clone());
            return Ok(entry.url);
        }

        metrics::record_cache_miss(1);
        let entry = self.sign(reference, &locator, None).await?;
        self.store(key, &entry);
        Ok(entry.url)
    }

    /// Resolve a reference to a download URL carrying
    /// `Content-Disposition: attachment; filename="..."`.
    ///
    /// Always signs; neither cache tier is read or written.
    pub async fn resolve_attachment(&self, reference: &str, filename: &str) -> ResolveResult<String> {
        let locator = self.parser.parse(reference);
        if locator.is_opaque() {
            return Ok(reference.to_string());
        }

        let disposition = format!("attachment; filename=\"{}\"", sanitize_filename(filename));
        let entry = self.sign(reference, &locator, Some(disposition)).await?;
        Ok(entry.url)
    }

    /// Call the signer for a non-opaque locator.
    pub(crate) async fn sign(
        &self,
        reference: &str,
        locator: &ObjectLocator,
        content_disposition: Option<String>,
    ) -> ResolveResult<SignedUrl> {
        let Some(mut request) = locator.sign_request(&self.default_container, self.url_ttl) else {
            return Err(ResolveError::Config(format!(
                "reference has nothing to sign: {reference}"
            )));
        };
        let variant = if content_disposition.is_some() {
            "attachment"
        } else {
            "inline"
        };
        if let Some(disposition) = content_disposition {
            request = request.with_content_disposition(disposition);
        }

        match self.signer.sign(&request).await {
            Ok(entry) => {
                metrics::record_sign(variant);
                Ok(entry)
            }
            Err(e) => {
                tracing::warn!(
                    reference = %reference,
                    locator = %locator,
                    category = %e.category(),
                    error = %e,
                    "signer failed"
                );
                metrics::record_sign_error(e.category().to_string());
                Err(ResolveError::sign(reference, e))
            }
        }
    }

    /// Write a freshly signed entry to the local tier and, in the background,
    /// to the distributed tier. Entries already inside the safety buffer are
    /// not cached anywhere.
    pub(crate) fn store(&self, key: String, entry: &SignedUrl) {
        if !self.local.put(key.clone(), entry.clone()) {
            tracing::debug!(key = %key, "signed URL expires within safety buffer, not caching");
            return;
        }
        if !self.distributed.is_enabled() {
            return;
        }

        let tier = self.distributed.clone();
        let entry = entry.clone();
        self.writer
            .submit("set", async move { tier.set(&key, &entry).await });
    }

    /// Snapshot of cache and writer state.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            local: self.local.stats(),
            distributed_enabled: self.distributed.is_enabled(),
            background_in_flight: self.writer.in_flight(),
            background_max_in_flight: self.writer.max_in_flight(),
        }
    }

    /// Wait for pending distributed writes. Intended for shutdown and tests.
    pub async fn flush_background_writes(&self) {
        self.writer.flush().await;
    }

    /// Start a task that periodically drops expired local entries.
    pub fn spawn_local_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let local = Arc::clone(&self.local);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = local.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = local.len(), "local cache sweep completed");
                }
            }
        })
    }
}

/// Make `filename` safe to embed in a quoted `Content-Disposition` value.
///
/// Keeps the last path segment, replaces quotes, backslashes and control
/// characters with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}
