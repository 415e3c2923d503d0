//! Error types for the signing and distributed cache collaborators.

use std::fmt;

/// Errors returned by an [`ObjectSigner`](crate::ObjectSigner).
///
/// A signing failure is fatal for the key being resolved and is propagated
/// to the caller verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignError {
    /// The object store could not be reached.
    #[error("Signer network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// The signer credentials were rejected.
    #[error("Signer unauthorized: {message}")]
    Unauthorized {
        /// Description of the credential failure.
        message: String,
    },

    /// The object key cannot be signed.
    #[error("Invalid object key {key}: {message}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why the key was rejected.
        message: String,
    },

    /// Any other signer failure.
    #[error("Signer internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl SignError {
    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Infrastructure,
            Self::Unauthorized { .. } => ErrorCategory::Auth,
            Self::InvalidKey { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Errors returned by a [`DistributedCache`](crate::DistributedCache) backend.
///
/// These never reach callers of the resolver; the tier wrapper logs them and
/// treats the affected keys as misses.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not obtain a connection to the backend.
    #[error("Cache connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The backend rejected or failed a command.
    #[error("Cache command error: {message}")]
    Command {
        /// Description of the command failure.
        message: String,
    },

    /// A cached value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend did not answer within its deadline.
    #[error("Cache operation timed out after {millis}ms")]
    Timeout {
        /// The deadline that elapsed.
        millis: u64,
    },
}

impl CacheError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Command` error.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => ErrorCategory::Infrastructure,
            Self::Command { .. } => ErrorCategory::Internal,
            Self::Serialization(_) => ErrorCategory::Validation,
        }
    }
}

/// Categories of collaborator errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credentials rejected.
    Auth,
    /// Input rejected.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
