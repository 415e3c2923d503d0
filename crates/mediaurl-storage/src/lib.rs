//! # mediaurl-storage
//!
//! Object locator parsing and collaborator traits for signed media URL
//! resolution.
//!
//! This crate defines the types and traits that the resolver and its
//! collaborators share. It contains no caching logic; see `mediaurl-resolver`.
//!
//! ## Overview
//!
//! - [`LocatorParser`] turns reference strings into [`ObjectLocator`]s.
//! - [`ObjectSigner`] is the origin signer (the object store's presign call).
//! - [`DistributedCache`] is the shared key-value store used as the second
//!   cache tier.
//!
//! ## Example
//!
//! ```ignore
//! use mediaurl_storage::{LocatorParser, ObjectLocator};
//!
//! let parser = LocatorParser::default();
//! match parser.parse("store://avatars/u1.png") {
//!     ObjectLocator::Canonical { container, key } => { /* sign it */ }
//!     ObjectLocator::Legacy { key } => { /* sign against the default container */ }
//!     ObjectLocator::Opaque(original) => { /* hand back unchanged */ }
//! }
//! ```

mod error;
pub mod locator;
pub mod s3_signer;
mod traits;
mod types;

pub use error::{CacheError, ErrorCategory, SignError};
pub use locator::{LocatorParser, ParserConfig};
pub use s3_signer::S3SignerConfig;
#[cfg(feature = "s3")]
pub use s3_signer::S3Signer;
pub use traits::{DistributedCache, ObjectSigner};
pub use types::{ObjectLocator, SignRequest, SignedUrl};

/// Type alias for a shareable signer instance.
pub type DynSigner = std::sync::Arc<dyn ObjectSigner>;

/// Type alias for a shareable distributed cache backend.
pub type DynDistributedCache = std::sync::Arc<dyn DistributedCache>;
