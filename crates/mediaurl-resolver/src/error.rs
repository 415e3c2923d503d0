//! Error types for URL resolution

use mediaurl_storage::SignError;
use thiserror::Error;

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors surfaced to callers of the resolver.
///
/// Cache tier failures never appear here: they are logged and treated as
/// misses.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The origin signer failed for this reference
    #[error("failed to sign {reference}: {source}")]
    Sign {
        reference: String,
        #[source]
        source: SignError,
    },

    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    pub fn sign(reference: impl Into<String>, source: SignError) -> Self {
        Self::Sign {
            reference: reference.into(),
            source,
        }
    }

    /// The signer error, if this is a signing failure
    pub fn sign_error(&self) -> Option<&SignError> {
        match self {
            Self::Sign { source, .. } => Some(source),
            Self::Config(_) => None,
        }
    }
}
