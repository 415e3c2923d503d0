//! # mediaurl-resolver
//!
//! Turns storage references into time-limited signed URLs, with a
//! process-local cache in front of a shared Redis cache in front of the
//! object store's signer.
//!
//! - [`UrlResolver::resolve`] for one reference
//! - [`UrlResolver::resolve_batch`] for many, with one bulk read per tier
//! - [`UrlResolver::resolve_attachment`] for uncached download links
//!
//! Construction from configuration goes through [`build_resolver`].

pub mod background;
mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod resolver;

use std::sync::Arc;

use mediaurl_storage::{DistributedCache, DynSigner, LocatorParser};

pub use background::BackgroundWriter;
pub use cache::{DistributedTier, LocalCache, LocalCacheStats, RedisDistributedCache};
pub use config::{
    CacheConfig, LocalSignerConfig, LoggingConfig, RedisConfig, ResolverConfig, SignerBackend,
    SignerConfig,
};
pub use error::{ResolveError, ResolveResult};
pub use observability::{
    apply_logging_config, apply_logging_level, init_tracing_with_level,
};
pub use resolver::{ResolverStats, UrlResolver, sanitize_filename};

/// Create the distributed tier based on configuration.
///
/// ## Modes
///
/// - **Redis disabled**: Returns a disabled tier (local-only)
/// - **Redis enabled**: Attempts to connect to Redis, falls back to local-only on failure
///
/// ## Graceful Degradation
///
/// If the Redis connection fails, resolution still works using the local tier
/// and the signer. The process can start while Redis is unavailable.
pub async fn create_distributed_tier(redis: &RedisConfig, cache: &CacheConfig) -> DistributedTier {
    if !redis.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return DistributedTier::disabled(cache.safety_buffer());
    }

    tracing::info!(url = %redis.url, "Connecting to Redis");

    let backend = match RedisDistributedCache::from_config(redis) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return DistributedTier::disabled(cache.safety_buffer());
        }
    };

    // Test connection
    match backend.ping().await {
        Ok(()) => {
            tracing::info!("Connected to Redis successfully");
            DistributedTier::new(
                Arc::new(backend),
                cache.key_prefix.clone(),
                cache.distributed_deadline(),
                cache.safety_buffer(),
            )
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            DistributedTier::disabled(cache.safety_buffer())
        }
    }
}

/// Create the origin signer selected by configuration.
pub fn build_signer(config: &SignerConfig) -> ResolveResult<DynSigner> {
    match config.backend {
        SignerBackend::Local => {
            tracing::info!(base_url = %config.local.base_url, "Using local HMAC signer");
            Ok(Arc::new(mediaurl_memory::HmacSigner::new(
                &config.local.base_url,
                &config.local.secret,
            )))
        }
        #[cfg(feature = "s3")]
        SignerBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| ResolveError::Config("signer.backend=s3 requires [signer.s3]".into()))?;
            tracing::info!(endpoint = %s3.endpoint, region = %s3.region, "Using S3 presigner");
            let signer = mediaurl_storage::S3Signer::new(s3)
                .map_err(|e| ResolveError::Config(format!("invalid S3 signer settings: {e}")))?;
            Ok(Arc::new(signer))
        }
        #[cfg(not(feature = "s3"))]
        SignerBackend::S3 => Err(ResolveError::Config(
            "signer.backend=s3 requires building with the `s3` feature".into(),
        )),
    }
}

/// Build a resolver from validated configuration.
///
/// Connects to Redis if enabled. Does not start the local sweeper; see
/// [`UrlResolver::spawn_local_sweeper`].
pub async fn build_resolver(config: &ResolverConfig) -> ResolveResult<UrlResolver> {
    config.validate().map_err(ResolveError::Config)?;

    let signer = build_signer(&config.signer)?;
    let local = Arc::new(LocalCache::new(
        config.cache.safety_buffer(),
        config.cache.local_max_entries,
    ));
    let distributed = create_distributed_tier(&config.redis, &config.cache).await;

    Ok(UrlResolver::new(signer, local, distributed)
        .with_parser(LocatorParser::new(&config.parser))
        .with_url_ttl(config.cache.url_ttl())
        .with_default_container(config.signer.default_container.clone())
        .with_background_writer(BackgroundWriter::new(config.cache.background_max_in_flight)))
}
