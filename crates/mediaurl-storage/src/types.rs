//! Data types shared by the resolver and its collaborators.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A signed URL together with the instant it stops being valid.
///
/// Entries are immutable: a refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    /// The time-limited access URL.
    pub url: String,
    /// When the signer says the URL expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl SignedUrl {
    /// Creates a new `SignedUrl`.
    #[must_use]
    pub fn new(url: impl Into<String>, expires_at: OffsetDateTime) -> Self {
        Self {
            url: url.into(),
            expires_at,
        }
    }

    /// Returns `true` if the URL may still be handed out at `now`.
    ///
    /// A URL is only eligible while `now + safety_buffer < expires_at`.
    #[must_use]
    pub fn is_eligible_at(&self, now: OffsetDateTime, safety_buffer: Duration) -> bool {
        now + safety_buffer < self.expires_at
    }

    /// Returns `true` if the URL may still be handed out right now.
    #[must_use]
    pub fn is_eligible(&self, safety_buffer: Duration) -> bool {
        self.is_eligible_at(OffsetDateTime::now_utc(), safety_buffer)
    }

    /// How long the entry remains eligible after `now`, if at all.
    ///
    /// Used as the distributed-tier TTL so the shared store drops an entry
    /// at the moment it stops being servable.
    #[must_use]
    pub fn eligible_for(&self, now: OffsetDateTime, safety_buffer: Duration) -> Option<Duration> {
        let remaining = self.expires_at - (now + safety_buffer);
        if remaining.is_positive() {
            Duration::try_from(remaining).ok()
        } else {
            None
        }
    }
}

/// A request to the origin signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    /// Bucket or container holding the object.
    pub container: String,
    /// Object key inside the container.
    pub key: String,
    /// Requested validity of the URL.
    pub ttl: Duration,
    /// Optional `Content-Disposition` directive embedded in the URL.
    pub content_disposition: Option<String>,
}

impl SignRequest {
    /// Creates a plain read request.
    #[must_use]
    pub fn new(container: impl Into<String>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
            ttl,
            content_disposition: None,
        }
    }

    /// Attaches a `Content-Disposition` directive.
    #[must_use]
    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }
}

/// A parsed reference to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectLocator {
    /// Explicit `scheme://container/key` form.
    Canonical {
        /// Bucket or container name.
        container: String,
        /// Object key.
        key: String,
    },
    /// Key recovered from a historical storage URL.
    Legacy {
        /// Object key, relative to the default container.
        key: String,
    },
    /// Unrecognized input, returned to callers unchanged.
    Opaque(String),
}

impl ObjectLocator {
    /// The key under which signed URLs for this locator are cached.
    ///
    /// Returns `None` for opaque locators, which are never cached.
    #[must_use]
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Canonical { container, key } => Some(format!("{container}/{key}")),
            Self::Legacy { key } => Some(format!("legacy:{key}")),
            Self::Opaque(_) => None,
        }
    }

    /// Returns `true` for unrecognized references.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }

    /// Builds the signer request for this locator.
    ///
    /// Legacy locators sign against `default_container`. Opaque locators have
    /// nothing to sign and return `None`.
    #[must_use]
    pub fn sign_request(&self, default_container: &str, ttl: Duration) -> Option<SignRequest> {
        match self {
            Self::Canonical { container, key } => Some(SignRequest::new(container, key, ttl)),
            Self::Legacy { key } => Some(SignRequest::new(default_container, key, ttl)),
            Self::Opaque(_) => None,
        }
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical { container, key } => write!(f, "{container}/{key}"),
            Self::Legacy { key } => write!(f, "legacy:{key}"),
            Self::Opaque(original) => write!(f, "{original}"),
        }
    }
}
