//! Collaborator traits.
//!
//! The resolver talks to two external systems: the object store that signs
//! URLs, and a shared key-value store used as the distributed cache tier.
//! Both are consumed through the traits below so that deployments can plug in
//! Redis, S3, or in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, SignError};
use crate::types::{SignRequest, SignedUrl};

/// The origin signer: produces a time-limited URL for a stored object.
///
/// Implementations must be thread-safe (`Send + Sync`). Calls are never
/// cached by the implementation; caching is the resolver's job.
///
/// # Example
///
/// ```ignore
/// use mediaurl_storage::{ObjectSigner, SignRequest};
///
/// async fn sign_avatar(signer: &dyn ObjectSigner) -> Result<String, SignError> {
///     let request = SignRequest::new("avatars", "u1.png", Duration::from_secs(3600));
///     Ok(signer.sign(&request).await?.url)
/// }
/// ```
#[async_trait]
pub trait ObjectSigner: Send + Sync {
    /// Signs a URL for `request.container/request.key`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignError`] on network, credential, or key failures.
    async fn sign(&self, request: &SignRequest) -> Result<SignedUrl, SignError>;
}

/// A shared string key-value store with per-entry TTL.
///
/// Values are opaque strings; encoding is the caller's concern. Bulk writes
/// are not required to be atomic across entries.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// Reads a single value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Reads many values at once. The result is aligned with `keys`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Writes a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Writes many `(key, value, ttl)` entries in one round trip.
    async fn pipeline_set(&self, entries: &[(String, String, Duration)]) -> Result<(), CacheError>;

    /// Checks backend connectivity (for health checks).
    async fn ping(&self) -> Result<(), CacheError>;
}
