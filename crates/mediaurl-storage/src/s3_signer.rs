//! S3-compatible origin signer.
//!
//! Presigns GET URLs against AWS S3, MinIO, Cloudflare R2 and other
//! S3-compatible endpoints. A bucket handle is built per container on each
//! call; all containers share one set of credentials.
//!
//! `S3SignerConfig` is always available so configuration files parse the
//! same way regardless of features; `S3Signer` requires the `s3` feature.

use serde::{Deserialize, Serialize};

#[cfg(feature = "s3")]
use {
    crate::error::SignError,
    crate::traits::ObjectSigner,
    crate::types::{SignRequest, SignedUrl},
    async_trait::async_trait,
    std::collections::HashMap,
    time::OffsetDateTime,
};

/// Maximum presign validity accepted by S3 (7 days).
#[cfg(feature = "s3")]
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 3600;

/// Connection settings for the S3 signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3SignerConfig {
    /// Endpoint URL, e.g. `https://s3.eu-west-1.amazonaws.com`.
    pub endpoint: String,
    /// Region name. Defaults to `us-east-1` for non-AWS endpoints.
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Use path-style addressing (required by MinIO).
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

/// Origin signer backed by S3 presigned GET URLs.
#[cfg(feature = "s3")]
pub struct S3Signer {
    region: s3::Region,
    credentials: s3::creds::Credentials,
    path_style: bool,
}

#[cfg(feature = "s3")]
impl S3Signer {
    /// Builds a signer from configuration.
    pub fn new(config: &S3SignerConfig) -> Result<Self, SignError> {
        let region = s3::Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = s3::creds::Credentials::new(
            Some(config.access_key.as_str()),
            Some(config.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| SignError::unauthorized(format!("invalid S3 credentials: {e}")))?;

        Ok(Self {
            region,
            credentials,
            path_style: config.path_style,
        })
    }

    fn bucket(&self, container: &str) -> Result<Box<s3::Bucket>, SignError> {
        let bucket = s3::Bucket::new(container, self.region.clone(), self.credentials.clone())
            .map_err(|e| SignError::invalid_key(container, format!("invalid bucket: {e}")))?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[cfg(feature = "s3")]
#[async_trait]
impl ObjectSigner for S3Signer {
    async fn sign(&self, request: &SignRequest) -> Result<SignedUrl, SignError> {
        let bucket = self.bucket(&request.container)?;
        let expiry_secs = request.ttl.as_secs().clamp(1, MAX_PRESIGN_SECS);

        let custom_queries = request.content_disposition.as_ref().map(|disposition| {
            HashMap::from([(
                "response-content-disposition".to_string(),
                disposition.clone(),
            )])
        });

        let issued_at = OffsetDateTime::now_utc();
        let url = bucket
            .presign_get(&request.key, expiry_secs as u32, custom_queries)
            .await
            .map_err(|e| SignError::network(format!("presign failed: {e}")))?;

        tracing::debug!(
            container = %request.container,
            key = %request.key,
            expiry_secs,
            "presigned S3 GET URL"
        );

        Ok(SignedUrl::new(
            url,
            issued_at + time::Duration::seconds(expiry_secs as i64),
        ))
    }
}
