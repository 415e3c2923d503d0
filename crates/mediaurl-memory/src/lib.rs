//! In-memory collaborators for mediaurl.
//!
//! This crate provides implementations of the `mediaurl-storage` traits that
//! need no external services:
//!
//! - [`InMemoryDistributedCache`]: a `DistributedCache` with per-entry TTL
//! - [`HmacSigner`]: an `ObjectSigner` issuing HMAC-signed URLs
//!
//! # Example
//!
//! ```ignore
//! use mediaurl_memory::{HmacSigner, InMemoryDistributedCache};
//!
//! let cache = InMemoryDistributedCache::shared();
//! let signer = std::sync::Arc::new(HmacSigner::new("https://media.local", "dev-secret"));
//! ```

pub mod cache;
pub mod signer;

pub use cache::{InMemoryDistributedCache, OperationCounts};
pub use signer::HmacSigner;
