//! Local HMAC signer.
//!
//! Produces URLs of the form
//! `{base_url}/{container}/{key}?expires={unix}&signature={hex}` where the
//! signature is HMAC-SHA256 over the container, key, expiry and optional
//! content disposition. A file server that shares the secret can verify them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use mediaurl_storage::{ObjectSigner, SignError, SignRequest, SignedUrl};
use sha2::Sha256;
use time::OffsetDateTime;
use tokio::sync::RwLock;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic signer for development and tests.
pub struct HmacSigner {
    base_url: String,
    secret: Vec<u8>,
    latency: Option<Duration>,
    failing_keys: RwLock<HashSet<String>>,
    calls: AtomicU64,
}

impl HmacSigner {
    /// Creates a signer that issues URLs under `base_url`.
    pub fn new(base_url: impl Into<String>, secret: impl AsRef<[u8]>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.as_ref().to_vec(),
            latency: None,
            failing_keys: RwLock::new(HashSet::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Simulates origin latency on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes signing of `key` fail until [`HmacSigner::recover`] is called.
    pub async fn fail_on(&self, key: impl Into<String>) {
        self.failing_keys.write().await.insert(key.into());
    }

    pub async fn recover(&self, key: &str) {
        self.failing_keys.write().await.remove(key);
    }

    /// Number of `sign` calls made so far, successful or not.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn signature(&self, request: &SignRequest, expires: i64) -> Result<String, SignError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| SignError::unauthorized(format!("invalid signing secret: {e}")))?;
        mac.update(request.container.as_bytes());
        mac.update(b"\n");
        mac.update(request.key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        if let Some(disposition) = &request.content_disposition {
            mac.update(b"\n");
            mac.update(disposition.as_bytes());
        }
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ObjectSigner for HmacSigner {
    async fn sign(&self, request: &SignRequest) -> Result<SignedUrl, SignError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if request.container.is_empty() || request.key.is_empty() {
            return Err(SignError::invalid_key(
                format!("{}/{}", request.container, request.key),
                "container and key must be non-empty",
            ));
        }
        if self.failing_keys.read().await.contains(&request.key) {
            return Err(SignError::network(format!(
                "simulated origin failure for {}",
                request.key
            )));
        }

        let ttl = time::Duration::try_from(request.ttl)
            .map_err(|e| SignError::internal(format!("ttl out of range: {e}")))?;
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(ttl)
            .ok_or_else(|| {
                SignError::internal(format!("ttl of {}s overflows expiry", ttl.whole_seconds()))
            })?;
        let expires = expires_at.unix_timestamp();
        let signature = self.signature(request, expires)?;

        let encoded_key = request
            .key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let mut url = format!(
            "{}/{}/{}?expires={}&signature={}",
            self.base_url,
            urlencoding::encode(&request.container),
            encoded_key,
            expires,
            signature
        );
        if let Some(disposition) = &request.content_disposition {
            url.push_str("&response-content-disposition=");
            url.push_str(&urlencoding::encode(disposition));
        }

        tracing::trace!(container = %request.container, key = %request.key, "signed local URL");
        Ok(SignedUrl::new(url, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_produces_verifiable_url() {
        let signer = HmacSigner::new("https://media.local/", "secret");
        let request = SignRequest::new("avatars", "users/1/me.png", Duration::from_secs(600));

        let signed = signer.sign(&request).await.unwrap();
        assert!(signed.url.starts_with("https://media.local/avatars/users/1/me.png?expires="));
        assert!(signed.url.contains("&signature="));
        assert!(signed.is_eligible(Duration::from_secs(60)));
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_sign_encodes_disposition() {
        let signer = HmacSigner::new("https://media.local", "secret");
        let request = SignRequest::new("b", "k.pdf", Duration::from_secs(60))
            .with_content_disposition("attachment; filename=\"k.pdf\"");

        let signed = signer.sign(&request).await.unwrap();
        assert!(signed.url.contains("response-content-disposition=attachment%3B"));
    }

    #[tokio::test]
    async fn test_fail_on_and_recover() {
        let signer = HmacSigner::new("https://media.local", "secret");
        let request = SignRequest::new("b", "broken.jpg", Duration::from_secs(60));

        signer.fail_on("broken.jpg").await;
        let err = signer.sign(&request).await.unwrap_err();
        assert!(matches!(err, SignError::Network { .. }));

        signer.recover("broken.jpg").await;
        assert!(signer.sign(&request).await.is_ok());
        assert_eq!(signer.calls(), 2);
    }

    #[tokio::test]
    async fn test_ttl_past_representable_range_is_error() {
        let signer = HmacSigner::new("https://media.local", "secret");
        let request = SignRequest::new("b", "a.jpg", Duration::from_secs(400_000_000_000));

        let err = signer.sign(&request).await.unwrap_err();
        assert!(matches!(err, SignError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_container_is_encoded() {
        let signer = HmacSigner::new("https://media.local", "secret");
        let request = SignRequest::new("my bucket?x", "a b.jpg", Duration::from_secs(60));

        let signed = signer.sign(&request).await.unwrap();
        assert!(
            signed
                .url
                .starts_with("https://media.local/my%20bucket%3Fx/a%20b.jpg?expires="),
            "{}",
            signed.url
        );
        assert_eq!(signed.url.matches('?').count(), 1);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let signer = HmacSigner::new("https://media.local", "secret");
        let request = SignRequest::new("b", "", Duration::from_secs(60));
        assert!(matches!(
            signer.sign(&request).await,
            Err(SignError::InvalidKey { .. })
        ));
    }
}
